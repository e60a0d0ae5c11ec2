//! Decoded ground-control commands.
//!
//! A command arrives as a flat JSON object whose keys carry the variant
//! prefix (`fc_` / `pc_`):
//!
//! | Key               | Type | Meaning                                  |
//! |-------------------|------|------------------------------------------|
//! | `Xc_soft_armed`   | bool | arm (true) or disarm (false)             |
//! | `Xc_redlines_armed` | bool | enable redline supervision             |
//! | `Xc_state`        | int  | packed requested relay vector            |
//! | `Xc_pulse`        | int  | relay to pulse, `-1` for none            |
//! | `Xc_pdelay`       | int  | pulse length [ms]                        |
//! | `pc_fire`         | bool | ignition toggle (prop only)              |
//!
//! Any missing or ill-typed key makes the whole command malformed; the
//! controller treats a malformed command as "no command this cycle".

use serde_json::{Map, Value};
use thiserror::Error;

use crate::consts::PULSE_DELAY_MS_MAX;
use crate::controller::ControllerVariant;
use crate::relay::RelayVector;

/// Reasons a received command is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Payload is not a JSON object.
    #[error("command is not a JSON object")]
    NotAnObject,

    /// Required key absent.
    #[error("command missing key '{0}'")]
    MissingKey(String),

    /// Key present with the wrong type or an out-of-range value.
    #[error("command key '{key}' invalid: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Request to pulse one relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRequest {
    /// Relay index, not range-checked here.
    pub position: usize,
    /// Time the relay stays flipped [ms].
    pub delay_ms: u64,
}

/// One decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub soft_armed: bool,
    pub redlines_armed: bool,
    /// Requested relay vector.
    pub state: RelayVector,
    pub pulse: Option<PulseRequest>,
    /// Ignition toggle; always `false` on the fill board.
    pub fire: bool,
}

impl Command {
    /// Decode raw datagram bytes.
    pub fn from_slice(variant: ControllerVariant, bytes: &[u8]) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CommandError::InvalidValue {
            key: "<payload>".to_string(),
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(map) => Self::decode(variant, &map),
            _ => Err(CommandError::NotAnObject),
        }
    }

    /// Decode a command mapping for `variant`.
    pub fn decode(variant: ControllerVariant, map: &Map<String, Value>) -> Result<Self, CommandError> {
        let soft_armed = read_bool(map, &variant.key("soft_armed"))?;
        let redlines_armed = read_bool(map, &variant.key("redlines_armed"))?;

        let state_key = variant.key("state");
        let packed = read_u64(map, &state_key)?;
        let state = RelayVector::unpack(packed).ok_or_else(|| CommandError::InvalidValue {
            key: state_key.clone(),
            reason: format!("{packed} does not fit {} relays", crate::consts::RELAY_COUNT),
        })?;

        let pulse_key = variant.key("pulse");
        let pulse_index = read_i64(map, &pulse_key)?;
        let pulse = match pulse_index {
            -1 => None,
            i if i < 0 => {
                return Err(CommandError::InvalidValue {
                    key: pulse_key,
                    reason: format!("{i} is not a relay index"),
                });
            }
            i => {
                let delay_key = variant.key("pdelay");
                let delay_ms = read_u64(map, &delay_key)?;
                if delay_ms > PULSE_DELAY_MS_MAX {
                    return Err(CommandError::InvalidValue {
                        key: delay_key,
                        reason: format!("{delay_ms} ms exceeds {PULSE_DELAY_MS_MAX} ms"),
                    });
                }
                Some(PulseRequest {
                    position: i as usize,
                    delay_ms,
                })
            }
        };

        let fire = if variant.supports_ignition() {
            read_bool(map, &variant.key("fire"))?
        } else {
            false
        };

        Ok(Self {
            soft_armed,
            redlines_armed,
            state,
            pulse,
            fire,
        })
    }

    /// Encode back into the key/value mapping (used by test harnesses and
    /// the ground-side simulator).
    pub fn encode(&self, variant: ControllerVariant) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(variant.key("soft_armed"), Value::from(self.soft_armed));
        map.insert(variant.key("redlines_armed"), Value::from(self.redlines_armed));
        map.insert(variant.key("state"), Value::from(self.state.pack()));
        match self.pulse {
            Some(p) => {
                map.insert(variant.key("pulse"), Value::from(p.position as i64));
                map.insert(variant.key("pdelay"), Value::from(p.delay_ms));
            }
            None => {
                map.insert(variant.key("pulse"), Value::from(-1));
                map.insert(variant.key("pdelay"), Value::from(0));
            }
        }
        if variant.supports_ignition() {
            map.insert(variant.key("fire"), Value::from(self.fire));
        }
        map
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value, CommandError> {
    map.get(key)
        .ok_or_else(|| CommandError::MissingKey(key.to_string()))
}

fn invalid(key: &str, expected: &str, got: &Value) -> CommandError {
    CommandError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected {expected}, got {got}"),
    }
}

fn read_bool(map: &Map<String, Value>, key: &str) -> Result<bool, CommandError> {
    let v = field(map, key)?;
    v.as_bool().ok_or_else(|| invalid(key, "bool", v))
}

fn read_u64(map: &Map<String, Value>, key: &str) -> Result<u64, CommandError> {
    let v = field(map, key)?;
    v.as_u64().ok_or_else(|| invalid(key, "non-negative integer", v))
}

fn read_i64(map: &Map<String, Value>, key: &str) -> Result<i64, CommandError> {
    let v = field(map, key)?;
    v.as_i64().ok_or_else(|| invalid(key, "integer", v))
}
