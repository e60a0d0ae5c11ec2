//! Relay output port backends.
//!
//! - [`SysfsGpio`]: Linux `/sys/class/gpio` interface on the controller board
//! - [`SimulatedOutput`]: in-memory port that records every write

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gse_common::gpio::{OutputError, PinId, RelayOutput};
use gse_common::relay::PinLevel;
use parking_lot::Mutex;
use tracing::{debug, trace};

// ─── Sysfs ──────────────────────────────────────────────────────────

/// Output port over the sysfs GPIO class.
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new() -> Self {
        Self::with_root("/sys/class/gpio")
    }

    /// Port rooted at an alternative sysfs directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pin_dir(&self, pin: PinId) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

fn write_attr(path: &Path, value: &str) -> std::io::Result<()> {
    fs::write(path, value)
}

impl RelayOutput for SysfsGpio {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn setup(&mut self, pin: PinId) -> Result<(), OutputError> {
        let setup_failed = |e: std::io::Error| OutputError::SetupFailed {
            pin,
            reason: e.to_string(),
        };

        if !self.pin_dir(pin).exists() {
            write_attr(&self.root.join("export"), &pin.to_string()).map_err(setup_failed)?;
        }
        write_attr(&self.pin_dir(pin).join("direction"), "out").map_err(setup_failed)?;
        debug!(pin, "GPIO exported as output");
        Ok(())
    }

    fn set(&mut self, pin: PinId, level: PinLevel) -> Result<(), OutputError> {
        let value = if level.is_high() { "1" } else { "0" };
        write_attr(&self.pin_dir(pin).join("value"), value).map_err(|e| {
            OutputError::WriteFailed {
                pin,
                reason: e.to_string(),
            }
        })
    }
}

// ─── Simulated ──────────────────────────────────────────────────────

/// Shared, ordered record of every pin write made through a
/// [`SimulatedOutput`].
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<(PinId, PinLevel)>>>);

impl WriteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all writes so far, oldest first.
    pub fn writes(&self) -> Vec<(PinId, PinLevel)> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Most recent level written to `pin`.
    pub fn last_level(&self, pin: PinId) -> Option<PinLevel> {
        self.0
            .lock()
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
    }

    fn push(&self, pin: PinId, level: PinLevel) {
        self.0.lock().push((pin, level));
    }
}

/// In-memory output port for `--simulate` runs and tests.
#[derive(Debug, Default)]
pub struct SimulatedOutput {
    log: WriteLog,
    levels: HashMap<PinId, PinLevel>,
    /// Pin whose writes fail; `None` level fails both levels.
    failing: Option<(PinId, Option<PinLevel>)>,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port that records into an existing log.
    pub fn with_log(log: WriteLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Make every write to `pin` fail.
    pub fn failing_on(mut self, pin: PinId) -> Self {
        self.failing = Some((pin, None));
        self
    }

    /// Make writes of `level` to `pin` fail; the other level still works.
    pub fn failing_on_level(mut self, pin: PinId, level: PinLevel) -> Self {
        self.failing = Some((pin, Some(level)));
        self
    }

    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }

    /// Level currently held by `pin`, if it was ever written.
    pub fn level(&self, pin: PinId) -> Option<PinLevel> {
        self.levels.get(&pin).copied()
    }
}

impl RelayOutput for SimulatedOutput {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn set(&mut self, pin: PinId, level: PinLevel) -> Result<(), OutputError> {
        let fails = match self.failing {
            Some((failing_pin, failing_level)) => {
                failing_pin == pin && failing_level.is_none_or(|l| l == level)
            }
            None => false,
        };
        if fails {
            return Err(OutputError::WriteFailed {
                pin,
                reason: "simulated fault".to_string(),
            });
        }
        trace!(pin, ?level, "simulated write");
        self.levels.insert(pin, level);
        self.log.push(pin, level);
        Ok(())
    }
}
