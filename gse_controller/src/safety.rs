//! Safety module root.
//!
//! Network-health tracking, redline evaluation, and the supervisor that
//! turns both into queued safing actions ahead of command processing.

pub mod network;
pub mod redline;
pub mod supervisor;

pub use network::NetworkHealth;
pub use redline::RedlineMonitor;
pub use supervisor::{SafetySupervisor, SafingAction, SharedSupervisor};
