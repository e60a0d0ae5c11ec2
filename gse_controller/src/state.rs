//! Relay state management.
//!
//! The relay state machine is the only writer of relay outputs after boot.
//! Every state change request (SCR) is validated against the armed gate and
//! the interlock policy before any pin is driven.

pub mod relays;

pub use relays::{Rejection, RelayStateMachine, SafeStates, UpdateOutcome};
