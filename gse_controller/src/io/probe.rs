//! Ground-control reachability probe.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use super::ConnectivityProbe;

/// Single ICMP echo via the system `ping` binary.
pub struct PingProbe {
    host: String,
    deadline_s: u32,
}

impl PingProbe {
    pub fn new(host: impl Into<String>, deadline_s: u32) -> Self {
        Self {
            host: host.into(),
            deadline_s,
        }
    }
}

impl ConnectivityProbe for PingProbe {
    async fn probe(&self) -> bool {
        let status = Command::new("ping")
            .args(["-c", "1", "-w", &self.deadline_s.to_string(), &self.host])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        // Hard cap in case ping ignores -w.
        let cap = Duration::from_secs(u64::from(self.deadline_s) + 1);
        match tokio::time::timeout(cap, status).await {
            Ok(Ok(status)) => {
                debug!(host = %self.host, success = status.success(), "ping finished");
                status.success()
            }
            Ok(Err(e)) => {
                warn!(host = %self.host, error = %e, "ping could not be spawned");
                false
            }
            Err(_) => {
                warn!(host = %self.host, "ping exceeded deadline");
                false
            }
        }
    }
}

/// Probe that always succeeds, for `--simulate` runs.
pub struct AlwaysReachable;

impl ConnectivityProbe for AlwaysReachable {
    async fn probe(&self) -> bool {
        true
    }
}
