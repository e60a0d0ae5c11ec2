//! # GSE Controller Library
//!
//! Relay state management for the ground-support fill and prop boards.
//! Remote commands, safety overrides and timed sequences all reach the
//! valve relays as state change requests (SCRs), and only SCRs that pass the
//! armed gate and the interlock policy are written to the outputs.
//!
//! ## Layers
//!
//! 1. **interlock**: pure mutual-exclusion / mutual-inclusion checks
//! 2. **state**: relay state machine, the single writer of relay outputs
//! 3. **sequence**: ignition, pulse and vent procedures
//! 4. **safety**: network-health and redline supervision
//! 5. **cycle**: actuator, telemetry and network tasks
//!
//! `io` holds the thin GPIO, UDP, probe and sensor backends.

pub mod config;
pub mod cycle;
pub mod interlock;
pub mod io;
pub mod safety;
pub mod sequence;
pub mod state;

#[cfg(test)]
mod test_support;
