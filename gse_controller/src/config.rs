//! TOML configuration loader with validation.
//!
//! Loads one [`ControllerConfig`] and resolves everything the runtime
//! needs once: GPIO mapping, interlock policy, safe states, ignition
//! script. Validates: shared fields, cycle periods, relay table, interlock
//! references, safe states against the policy, bleed position, redline
//! channels, and ignition step positions.

use std::path::Path;

use gse_common::config::{ConfigError, ConfigLoader};
use gse_common::consts::{ADC_CHANNELS, PERIOD_MS_MAX, PERIOD_MS_MIN};
use gse_common::controller::{ControllerConfig, IgnitionConfig, SequenceStep};
use gse_common::gpio::GpioMapping;
use gse_common::relay::RelayVector;

use crate::interlock::InterlockPolicy;
use crate::state::SafeStates;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ControllerConfig,
    pub mapping: GpioMapping,
    pub policy: InterlockPolicy,
    pub safe_states: SafeStates,
    /// Present on the prop board only.
    pub ignition: Option<IgnitionConfig>,
}

// ─── Loading Functions ──────────────────────────────────────────────

pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    resolve(ControllerConfig::load(path)?)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    resolve(ControllerConfig::load_str(content)?)
}

fn resolve(config: ControllerConfig) -> Result<LoadedConfig, ConfigError> {
    config.shared.validate()?;
    validate_periods(&config)?;

    let mapping = GpioMapping::from_relays(&config.relays)?;
    let policy = InterlockPolicy::from_config(&config.interlocks, &mapping)?;
    let safe_states = SafeStates::from_config(&config.states);
    validate_safe_states(&safe_states, &policy)?;
    validate_redlines(&config)?;

    let ignition = match (config.variant.supports_ignition(), &config.ignition) {
        (true, Some(ignition)) => Some(ignition.clone()),
        (true, None) => Some(IgnitionConfig::default()),
        (false, None) => None,
        (false, Some(_)) => {
            return Err(invalid(format!(
                "[ignition] is only valid on the prop board, variant is {:?}",
                config.variant
            )));
        }
    };
    if let Some(ignition) = &ignition {
        validate_steps("ignition.steps", &ignition.steps)?;
        validate_steps("ignition.abort", &ignition.abort)?;
    }

    Ok(LoadedConfig {
        config,
        mapping,
        policy,
        safe_states,
        ignition,
    })
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

// ─── Validation ─────────────────────────────────────────────────────

fn validate_periods(config: &ControllerConfig) -> Result<(), ConfigError> {
    let periods = [
        ("timing.actuator_period_ms", config.timing.actuator_period_ms),
        ("timing.telemetry_period_ms", config.timing.telemetry_period_ms),
        (
            "network.probe_period_s",
            config.network.probe_period_s.saturating_mul(1000),
        ),
    ];
    for (name, ms) in periods {
        if !(PERIOD_MS_MIN..=PERIOD_MS_MAX).contains(&ms) {
            return Err(invalid(format!(
                "{name} = {ms} ms out of range [{PERIOD_MS_MIN}, {PERIOD_MS_MAX}]"
            )));
        }
    }
    if config.network.probe_deadline_s == 0 {
        return Err(invalid("network.probe_deadline_s must be at least 1".to_string()));
    }
    Ok(())
}

/// Safe states must themselves pass the policy, or safing could be refused.
fn validate_safe_states(safe: &SafeStates, policy: &InterlockPolicy) -> Result<(), ConfigError> {
    if !RelayVector::is_valid_position(safe.bleed_position) {
        return Err(invalid(format!(
            "states.bleed_position {} out of range",
            safe.bleed_position
        )));
    }
    let named = [
        ("states.closed", safe.closed),
        ("states.vent", safe.vent),
        ("states.vent after bleed flip", safe.vent_bled()),
    ];
    for (name, vector) in named {
        policy
            .check(&vector)
            .map_err(|v| invalid(format!("{name} {vector}: {v}")))?;
    }
    Ok(())
}

fn validate_redlines(config: &ControllerConfig) -> Result<(), ConfigError> {
    for (i, redline) in config.redlines.iter().enumerate() {
        if redline.channel >= ADC_CHANNELS {
            return Err(invalid(format!(
                "redline {i}: channel {} out of range [0, {ADC_CHANNELS})",
                redline.channel
            )));
        }
        if !redline.max.is_finite() {
            return Err(invalid(format!("redline {i}: max must be finite")));
        }
    }
    Ok(())
}

fn validate_steps(name: &str, steps: &[SequenceStep]) -> Result<(), ConfigError> {
    for (i, step) in steps.iter().enumerate() {
        if let SequenceStep::Set { position, .. } = step {
            if !RelayVector::is_valid_position(*position) {
                return Err(invalid(format!(
                    "{name}[{i}]: relay position {position} out of range"
                )));
            }
        }
    }
    Ok(())
}
