//! Ignition procedure (prop board).
//!
//! The fire command is a toggle. The first press starts the configured
//! script in its own task; a press while it runs requests the abort
//! branch. The abort is observed at the next pause of the script.

use std::sync::Arc;

use gse_common::controller::IgnitionConfig;
use gse_common::relay::ScrTag;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{ScriptOutcome, SharedRelays, run_script};
use crate::state::RelayStateMachine;

/// Result of a fire toggle.
#[derive(Debug)]
pub enum ToggleOutcome {
    /// Script spawned. The task yields `None` if the controller was
    /// disarmed by the time it got the relays.
    Started(JoinHandle<Option<ScriptOutcome>>),
    /// A script was running; its abort branch was requested.
    AbortRequested,
    /// Disarmed: nothing happened.
    NotArmed,
}

/// Non-reentrant ignition controller.
#[derive(Debug, Clone)]
pub struct IgnitionSequence {
    config: Arc<IgnitionConfig>,
    /// Abort handle of the running script, if any.
    active: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl IgnitionSequence {
    pub fn new(config: IgnitionConfig) -> Self {
        Self {
            config: Arc::new(config),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Handle a fire command. `armed` is the latest relay snapshot.
    pub fn toggle(&self, relays: &SharedRelays, armed: bool) -> ToggleOutcome {
        let mut active = self.active.lock();
        if let Some(abort) = active.as_ref() {
            warn!("Fire pressed during ignition, aborting");
            abort.notify_one();
            return ToggleOutcome::AbortRequested;
        }
        if !armed {
            warn!("Fire ignored: controller disarmed");
            return ToggleOutcome::NotArmed;
        }

        let abort = Arc::new(Notify::new());
        *active = Some(Arc::clone(&abort));
        drop(active);

        let relays = Arc::clone(relays);
        let config = Arc::clone(&self.config);
        let slot = Arc::clone(&self.active);
        let handle = tokio::spawn(async move {
            let mut sm = relays.lock_owned().await;
            if !sm.is_armed() {
                warn!("Ignition cancelled: disarmed before start");
                *slot.lock() = None;
                return None;
            }

            info!(steps = config.steps.len(), "IGNITION SEQUENCE STARTED");
            let outcome = run_script(&mut sm, &config.steps, ScrTag::Ignition, Some(abort.as_ref())).await;
            match &outcome {
                ScriptOutcome::Completed => info!("Ignition sequence complete"),
                ScriptOutcome::Aborted => {
                    warn!("Ignition aborted, running shutdown");
                    shutdown(&mut sm, &config).await;
                }
                ScriptOutcome::Rejected { step, reason } => {
                    error!(step, %reason, "Ignition step rejected, running shutdown");
                    shutdown(&mut sm, &config).await;
                }
            }
            *slot.lock() = None;
            Some(outcome)
        });
        ToggleOutcome::Started(handle)
    }

    /// Request the abort branch of a running script. `false` if idle.
    pub fn abort(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(abort) => {
                abort.notify_one();
                true
            }
            None => false,
        }
    }
}

async fn shutdown(sm: &mut RelayStateMachine, config: &IgnitionConfig) {
    let outcome = run_script(sm, &config.abort, ScrTag::Ignition, None).await;
    if outcome != ScriptOutcome::Completed {
        error!(?outcome, state = %sm.current(), "Ignition shutdown incomplete");
    }
}
