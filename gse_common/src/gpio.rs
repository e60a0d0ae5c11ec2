//! Relay output port trait and GPIO mapping.
//!
//! This module defines:
//! - `RelayOutput` trait - the only write surface to relay hardware
//! - `OutputError` enum - error types for pin writes
//! - `GpioMapping` - fixed bijection from relay index to physical pin

use std::collections::HashSet;

use thiserror::Error;

use crate::config::ConfigError;
use crate::consts::RELAY_COUNT;
use crate::controller::RelayConfig;
use crate::relay::PinLevel;

/// Physical pin identifier (BCM numbering on the controller board).
pub type PinId = u8;

/// Error types for relay output operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// Pin could not be claimed or configured as an output.
    #[error("GPIO {pin} setup failed: {reason}")]
    SetupFailed { pin: PinId, reason: String },

    /// Level write failed.
    #[error("GPIO {pin} write failed: {reason}")]
    WriteFailed { pin: PinId, reason: String },
}

/// Trait defining the relay output port.
///
/// Implementations drive one named pin high or low. They must not buffer:
/// when `set` returns `Ok`, the level is on the pin.
///
/// # Lifecycle
///
/// 1. `setup()` - Called once per mapped pin before any write
/// 2. `set()` - Called by the relay state machine for every committed change
pub trait RelayOutput: Send {
    /// Backend identifier (e.g., "sysfs", "simulated").
    fn name(&self) -> &'static str;

    /// Claim `pin` as an output.
    ///
    /// Default implementation does nothing (for backends without setup).
    fn setup(&mut self, _pin: PinId) -> Result<(), OutputError> {
        Ok(())
    }

    /// Drive `pin` to `level`.
    fn set(&mut self, pin: PinId, level: PinLevel) -> Result<(), OutputError>;
}

impl<T: RelayOutput + ?Sized> RelayOutput for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn setup(&mut self, pin: PinId) -> Result<(), OutputError> {
        (**self).setup(pin)
    }

    fn set(&mut self, pin: PinId, level: PinLevel) -> Result<(), OutputError> {
        (**self).set(pin, level)
    }
}

// ─── GPIO Mapping ───────────────────────────────────────────────────

/// Relay index → pin binding, immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioMapping {
    pins: [PinId; RELAY_COUNT],
    names: Vec<String>,
}

impl GpioMapping {
    /// Build from the ordered `[[relays]]` table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the table does not have
    /// exactly `RELAY_COUNT` entries, or if pins or names repeat.
    pub fn from_relays(relays: &[RelayConfig]) -> Result<Self, ConfigError> {
        if relays.len() != RELAY_COUNT {
            return Err(ConfigError::ValidationError(format!(
                "expected {RELAY_COUNT} relays, got {}",
                relays.len()
            )));
        }

        let mut pins = [0; RELAY_COUNT];
        let mut seen_pins = HashSet::new();
        let mut seen_names = HashSet::new();
        for (i, relay) in relays.iter().enumerate() {
            if relay.name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "relay {i} has an empty name"
                )));
            }
            if !seen_pins.insert(relay.pin) {
                return Err(ConfigError::ValidationError(format!(
                    "GPIO {} mapped to more than one relay",
                    relay.pin
                )));
            }
            if !seen_names.insert(relay.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate relay name '{}'",
                    relay.name
                )));
            }
            pins[i] = relay.pin;
        }

        Ok(Self {
            pins,
            names: relays.iter().map(|r| r.name.clone()).collect(),
        })
    }

    #[inline]
    pub const fn pin(&self, index: usize) -> PinId {
        self.pins[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub const fn pins(&self) -> &[PinId; RELAY_COUNT] {
        &self.pins
    }

    /// Index of the relay called `name`.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
