//! Timed relay procedures: ignition, pulse, vent.
//!
//! A procedure runs against an exclusively borrowed [`RelayStateMachine`]
//! (the caller holds the relay lock for its whole duration), so no other
//! SCR can interleave with its steps. Set-steps go through the validated
//! `request_state` / `update` path; consecutive set-steps with no pause
//! between them form one SCR.

pub mod ignition;
pub mod pulse;
pub mod vent;

use std::sync::Arc;
use std::time::Duration;

use gse_common::controller::SequenceStep;
use gse_common::relay::{RelayVector, ScrTag};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::state::{Rejection, RelayStateMachine, UpdateOutcome};

pub use ignition::{IgnitionSequence, ToggleOutcome};
pub use pulse::pulse;
pub use vent::{apply_safing, close, vent};

/// Relay state machine shared between the control cycles and sequences.
pub type SharedRelays = Arc<Mutex<RelayStateMachine>>;

pub fn shared(relays: RelayStateMachine) -> SharedRelays {
    Arc::new(Mutex::new(relays))
}

/// How a script ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Completed,
    /// Abort observed at a pause.
    Aborted,
    /// The SCR ending at step `step` was rejected.
    Rejected { step: usize, reason: Rejection },
}

/// Run `steps` in order, tagging every SCR with `tag`.
///
/// Pauses race against `abort` when given; set-steps are never interrupted.
pub async fn run_script(
    relays: &mut RelayStateMachine,
    steps: &[SequenceStep],
    tag: ScrTag,
    abort: Option<&Notify>,
) -> ScriptOutcome {
    let mut pending: Option<RelayVector> = None;

    for (idx, step) in steps.iter().enumerate() {
        match *step {
            SequenceStep::Set { position, on } => {
                if !RelayVector::is_valid_position(position) {
                    warn!(step = idx, position, "Sequence step targets unknown relay, skipped");
                    continue;
                }
                let base = pending.unwrap_or_else(|| relays.current());
                pending = Some(base.with(position, on));
            }
            SequenceStep::Sleep { ms } => {
                if let Some(vector) = pending.take() {
                    if let Err(reason) = submit(relays, vector, tag) {
                        return ScriptOutcome::Rejected { step: idx, reason };
                    }
                }
                if !pause(Duration::from_millis(ms), abort).await {
                    return ScriptOutcome::Aborted;
                }
            }
        }
    }

    match pending.map(|vector| submit(relays, vector, tag)) {
        Some(Err(reason)) => ScriptOutcome::Rejected {
            step: steps.len(),
            reason,
        },
        _ => ScriptOutcome::Completed,
    }
}

fn submit(relays: &mut RelayStateMachine, vector: RelayVector, tag: ScrTag) -> Result<(), Rejection> {
    relays.request_state(vector, tag);
    match relays.update() {
        UpdateOutcome::Rejected(reason) => Err(reason),
        outcome => {
            debug!(?outcome, state = %relays.current(), "Sequence step applied");
            Ok(())
        }
    }
}

/// Sleep for `duration`; `false` if `abort` fired first.
async fn pause(duration: Duration, abort: Option<&Notify>) -> bool {
    match abort {
        None => {
            tokio::time::sleep(duration).await;
            true
        }
        Some(abort) => tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = abort.notified() => false,
        },
    }
}
