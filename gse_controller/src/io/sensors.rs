//! Sensor sources.
//!
//! ADC conversion lives outside this crate; off-target both boards report
//! zeroed channels and only the CPU temperature is real.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use gse_common::consts::ADC_CHANNELS;
use gse_common::telemetry::SensorSnapshot;
use parking_lot::Mutex;
use tracing::debug;

use super::SensorSource;

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Host-backed source: CPU temperature from the thermal zone, zeroed ADC.
pub struct HostSensors {
    thermal_path: PathBuf,
}

impl HostSensors {
    pub fn new() -> Self {
        Self {
            thermal_path: PathBuf::from(THERMAL_ZONE),
        }
    }

    fn cpu_temp(&self) -> f64 {
        match fs::read_to_string(&self.thermal_path) {
            // Millidegrees.
            Ok(raw) => raw.trim().parse::<f64>().map(|m| m / 1000.0).unwrap_or(0.0),
            Err(e) => {
                debug!(path = %self.thermal_path.display(), error = %e, "CPU temperature unavailable");
                0.0
            }
        }
    }
}

impl Default for HostSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for HostSensors {
    fn read(&mut self) -> SensorSnapshot {
        SensorSnapshot {
            cpu_temp: self.cpu_temp(),
            channels: [0.0; ADC_CHANNELS],
            hard_armed: false,
        }
    }
}

/// Source returning whatever snapshot was last stored through its handle.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensors {
    snapshot: Arc<Mutex<SensorSnapshot>>,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channel(&self, channel: usize, value: f64) {
        self.snapshot.lock().channels[channel] = value;
    }

    pub fn set(&self, snapshot: SensorSnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl SensorSource for SimulatedSensors {
    fn read(&mut self) -> SensorSnapshot {
        *self.snapshot.lock()
    }
}
