//! Thin collaborators around the relay core: GPIO output ports, the UDP
//! command/telemetry transport, the connectivity probe and sensor sources.
//!
//! The control cycles only see the traits below; `main` picks the concrete
//! backends (real hardware or `--simulate`).

pub mod gpio;
pub mod probe;
pub mod sensors;
pub mod udp;

use std::future::Future;

use gse_common::command::Command;
use gse_common::telemetry::SensorSnapshot;
use serde_json::{Map, Value};

pub use udp::TransportError;

/// Source of the latest sensor readings.
pub trait SensorSource: Send {
    fn read(&mut self) -> SensorSnapshot;
}

/// Non-blocking source of decoded ground-control commands.
pub trait CommandSource: Send {
    /// Next pending command, or `None` when nothing valid arrived.
    fn poll_command(&mut self) -> Option<Command>;
}

/// Destination of flattened telemetry frames.
pub trait TelemetrySink: Send {
    fn send(&mut self, frame: &Map<String, Value>) -> Result<(), TransportError>;
}

/// Reachability check of the ground-control host.
pub trait ConnectivityProbe: Send + Sync {
    /// `true` if ground control answered within the probe deadline.
    fn probe(&self) -> impl Future<Output = bool> + Send;
}
