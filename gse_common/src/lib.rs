//! GSE Common Library
//!
//! Shared types for the ground-support fill and prop controllers: the
//! fixed-width relay vector, state-change tags, the relay output port trait,
//! configuration structures and the command/telemetry mappings exchanged with
//! ground control.
//!
//! # Module Structure
//!
//! - [`consts`] - Relay count, cycle periods and safety thresholds
//! - [`relay`] - `RelayVector`, `PinLevel`, `ScrTag`
//! - [`gpio`] - `RelayOutput` port trait and `GpioMapping`
//! - [`config`] - Configuration loading traits and types
//! - [`controller`] - Controller configuration (relays, states, interlocks, timing)
//! - [`command`] - Decoded ground-control commands
//! - [`telemetry`] - Telemetry frames and sensor snapshots
//! - [`prelude`] - Common re-exports for convenience

pub mod command;
pub mod config;
pub mod consts;
pub mod controller;
pub mod gpio;
pub mod prelude;
pub mod relay;
pub mod telemetry;
