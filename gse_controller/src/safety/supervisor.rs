//! Safety supervisor.
//!
//! Collects safing requests from the network-health and telemetry cycles
//! and hands the most severe one to the actuator cycle, which applies it
//! before touching the pending command. Lives behind a `parking_lot`
//! mutex; no lock is ever held across an await.

use std::sync::Arc;
use std::time::Instant;

use gse_common::controller::{ControllerConfig, SafingTarget};
use gse_common::relay::ScrTag;
use gse_common::telemetry::SensorSnapshot;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::network::NetworkHealth;
use super::redline::RedlineMonitor;

pub type SharedSupervisor = Arc<Mutex<SafetySupervisor>>;

/// Forced transition to a safe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafingAction {
    pub target: SafingTarget,
    /// `AutoSafe` or `Redline`.
    pub tag: ScrTag,
}

#[derive(Debug)]
pub struct SafetySupervisor {
    network: NetworkHealth,
    redlines: RedlineMonitor,
    redlines_armed: bool,
    pending: Option<SafingAction>,
    /// Set when a vent is queued; cleared by the next successful probe.
    vent_latched: bool,
}

impl SafetySupervisor {
    pub fn new(network: NetworkHealth, redlines: RedlineMonitor) -> Self {
        Self {
            network,
            redlines,
            redlines_armed: false,
            pending: None,
            vent_latched: false,
        }
    }

    pub fn from_config(config: &ControllerConfig, now: Instant) -> Self {
        Self::new(
            NetworkHealth::from_config(&config.network, now),
            RedlineMonitor::new(&config.redlines),
        )
    }

    pub fn into_shared(self) -> SharedSupervisor {
        Arc::new(Mutex::new(self))
    }

    // ── Inputs ──

    pub fn record_probe(&mut self, ok: bool, now: Instant) {
        if ok && self.vent_latched {
            info!("Network restored, accepting commands again");
            self.vent_latched = false;
        }
        if let Some(target) = self.network.record(ok, now) {
            self.queue(SafingAction {
                target,
                tag: ScrTag::AutoSafe,
            });
        }
    }

    pub fn set_redlines_armed(&mut self, armed: bool) {
        if armed != self.redlines_armed {
            info!(armed, "Redline supervision changed");
            self.redlines_armed = armed;
        }
    }

    #[inline]
    pub const fn redlines_armed(&self) -> bool {
        self.redlines_armed
    }

    /// Evaluate redlines against `snapshot`; no-op unless armed.
    pub fn check_redlines(&mut self, snapshot: &SensorSnapshot) {
        if !self.redlines_armed {
            return;
        }
        if let Some(target) = self.redlines.evaluate(snapshot) {
            self.queue(SafingAction {
                target,
                tag: ScrTag::Redline,
            });
        }
    }

    /// Queue `action`, keeping whichever pending action is more severe.
    pub fn queue(&mut self, action: SafingAction) {
        if action.target == SafingTarget::Vent {
            if !self.vent_latched {
                warn!("Vent latched: command state requests discarded until network recovers");
            }
            self.vent_latched = true;
        }
        match self.pending {
            Some(pending) if pending.target >= action.target => {}
            _ => self.pending = Some(action),
        }
    }

    // ── Outputs ──

    /// Highest-priority queued action, consumed.
    pub fn take_action(&mut self) -> Option<SafingAction> {
        self.pending.take()
    }

    /// Put back an action that could not be applied this cycle.
    pub fn requeue(&mut self, action: SafingAction) {
        match self.pending {
            Some(pending) if pending.target > action.target => {}
            _ => self.pending = Some(action),
        }
    }

    pub const fn network(&self) -> &NetworkHealth {
        &self.network
    }

    /// Whether command state requests are currently discarded.
    #[inline]
    pub const fn commands_locked_out(&self) -> bool {
        self.vent_latched
    }
}
