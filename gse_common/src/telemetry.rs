//! Telemetry frames sent to ground control.
//!
//! A frame merges the relay snapshot, the redline flag and the latest
//! sensor readings into one flat mapping with variant-prefixed keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::ADC_CHANNELS;
use crate::controller::ControllerVariant;
use crate::relay::ScrTag;

/// Relay state machine snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayTelemetry {
    pub armed: bool,
    /// Packed current relay vector.
    pub state: u16,
    pub tag: ScrTag,
}

/// One read of every sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Board CPU temperature [°C].
    pub cpu_temp: f64,
    /// ADC readings, ADC 1 channels 1-4 then ADC 2 channels 1-4.
    pub channels: [f64; ADC_CHANNELS],
    /// Hardware arm switch state.
    pub hard_armed: bool,
}

/// Key suffix of ADC channel `index`, e.g. `adc2_c1` for index 4.
pub fn channel_key(index: usize) -> String {
    format!("adc{}_c{}", index / 4 + 1, index % 4 + 1)
}

/// Complete telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryFrame {
    /// Seconds since the first sample.
    pub timestamp: f64,
    pub redlines_armed: bool,
    pub relays: RelayTelemetry,
    pub sensors: SensorSnapshot,
}

impl TelemetryFrame {
    /// Flatten into the key/value mapping handed to the send node.
    pub fn to_map(&self, variant: ControllerVariant) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(variant.key("timestamp"), Value::from(self.timestamp));
        map.insert(variant.key("redlines_armed"), Value::from(self.redlines_armed));

        map.insert(variant.key("cpu_temp"), Value::from(self.sensors.cpu_temp));
        for (i, reading) in self.sensors.channels.iter().enumerate() {
            map.insert(variant.key(&channel_key(i)), Value::from(*reading));
        }
        map.insert(variant.key("hard_armed"), Value::from(self.sensors.hard_armed));

        map.insert(variant.key("soft_armed"), Value::from(self.relays.armed));
        map.insert(variant.key("state"), Value::from(self.relays.state));
        map.insert(variant.key("scr_tag"), Value::from(self.relays.tag.code()));
        map
    }
}
