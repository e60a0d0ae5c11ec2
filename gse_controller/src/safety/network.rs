//! Ground-control link health.
//!
//! One probe per network cycle. A single lost probe is tolerated; once
//! more than `degraded_threshold` probes fail in a row the link is
//! degraded and the relays are safed. If the last success is older than
//! the timeout the controller vents, otherwise it closes.

use std::time::{Duration, Instant};

use gse_common::controller::{NetworkConfig, SafingTarget};
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct NetworkHealth {
    consecutive_failures: u32,
    last_success: Instant,
    degraded_threshold: u32,
    timeout: Duration,
}

impl NetworkHealth {
    /// Link assumed healthy at `now`.
    pub fn new(now: Instant, degraded_threshold: u32, timeout: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            last_success: now,
            degraded_threshold,
            timeout,
        }
    }

    pub fn from_config(config: &NetworkConfig, now: Instant) -> Self {
        Self::new(
            now,
            config.degraded_threshold,
            Duration::from_secs(config.timeout_s),
        )
    }

    /// Record one probe result; returns the safing target once degraded.
    pub fn record(&mut self, ok: bool, now: Instant) -> Option<SafingTarget> {
        if ok {
            if self.consecutive_failures > 0 {
                info!(failures = self.consecutive_failures, "Ground control reachable again");
            }
            self.consecutive_failures = 0;
            self.last_success = now;
            return None;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        debug!(failures = self.consecutive_failures, "Probe failed");
        if self.consecutive_failures <= self.degraded_threshold {
            return None;
        }

        let silent = now.saturating_duration_since(self.last_success);
        error!(
            failures = self.consecutive_failures,
            silent_s = silent.as_secs(),
            "Bad network state detected"
        );
        if silent > self.timeout {
            Some(SafingTarget::Vent)
        } else {
            Some(SafingTarget::Closed)
        }
    }

    #[inline]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[inline]
    pub const fn last_success(&self) -> Instant {
        self.last_success
    }
}
