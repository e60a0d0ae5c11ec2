//! Common re-exports for convenience.
//!
//! ```rust
//! use gse_common::prelude::*;
//! ```

pub use crate::command::{Command, CommandError, PulseRequest};
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::consts::RELAY_COUNT;
pub use crate::controller::{ControllerConfig, ControllerVariant, SafingTarget, SequenceStep};
pub use crate::gpio::{GpioMapping, OutputError, PinId, RelayOutput};
pub use crate::relay::{PinLevel, RelayVector, ScrTag};
pub use crate::telemetry::{RelayTelemetry, SensorSnapshot, TelemetryFrame};
