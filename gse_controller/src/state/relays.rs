//! Relay state machine: current / requested vectors, armed flag, SCR tag.
//!
//! ```text
//!   request_state ──► requested ──update()──► [requested == current] ─► Unchanged
//!                                   │
//!                                   ├─ disarmed ─────────────► Rejected (revert)
//!                                   ├─ interlock violation ──► Rejected (revert)
//!                                   └─ write changed pins ───► Committed
//! ```
//!
//! `force_state` is the privileged safing path: it skips the armed gate but
//! never the interlock policy.

use std::time::Duration;

use gse_common::consts::RELAY_COUNT;
use gse_common::controller::StateConfig;
use gse_common::gpio::{GpioMapping, OutputError, RelayOutput};
use gse_common::relay::{RelayVector, ScrTag};
use gse_common::telemetry::RelayTelemetry;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::interlock::{InterlockPolicy, InterlockViolation};

// ─── Types ──────────────────────────────────────────────────────────

/// Named vectors the controller can always fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeStates {
    /// Driven unvalidated at construction.
    pub boot: RelayVector,
    pub closed: RelayVector,
    pub vent: RelayVector,
    /// Relay flipped once the vent state has settled.
    pub bleed_position: usize,
    pub vent_settle: Duration,
}

impl SafeStates {
    pub fn from_config(states: &StateConfig) -> Self {
        Self {
            boot: states.boot_state(),
            closed: states.closed,
            vent: states.vent,
            bleed_position: states.bleed_position,
            vent_settle: Duration::from_millis(states.vent_settle_ms),
        }
    }

    /// Vent vector after the bleed flip.
    pub fn vent_bled(&self) -> RelayVector {
        self.vent.toggled(self.bleed_position)
    }
}

/// Why the last SCR was not committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("controller is disarmed")]
    Disarmed,

    #[error(transparent)]
    Interlock(#[from] InterlockViolation),

    #[error("output fault: {0}")]
    OutputFault(#[from] OutputError),
}

/// Result of applying the pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Requested equals current; nothing was written.
    Unchanged,
    /// Request committed; `writes` pins changed level.
    Committed { writes: usize },
    /// Request reverted.
    Rejected(Rejection),
}

impl UpdateOutcome {
    #[inline]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    #[inline]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

// ─── State Machine ──────────────────────────────────────────────────

/// Owner of the relay outputs.
pub struct RelayStateMachine {
    output: Box<dyn RelayOutput>,
    mapping: GpioMapping,
    policy: InterlockPolicy,
    safe: SafeStates,
    current: RelayVector,
    requested: RelayVector,
    tag: ScrTag,
    armed: bool,
    last_rejection: Option<Rejection>,
    snapshot: watch::Sender<RelayTelemetry>,
}

impl RelayStateMachine {
    /// Claim every mapped pin and drive it to the boot vector.
    ///
    /// Boot bypasses the interlock policy; the configuration loader has
    /// already checked the safe states. Starts disarmed with tag `User`.
    ///
    /// # Errors
    ///
    /// Any pin setup or write failure. Startup cannot continue with relays
    /// in an unknown state.
    pub fn new(
        mapping: GpioMapping,
        mut output: Box<dyn RelayOutput>,
        policy: InterlockPolicy,
        safe: SafeStates,
    ) -> Result<Self, OutputError> {
        for (i, &pin) in mapping.pins().iter().enumerate() {
            output.setup(pin)?;
            output.set(pin, safe.boot.get(i).into())?;
        }
        info!(backend = output.name(), state = %safe.boot, "Relays initialized");

        let initial = RelayTelemetry {
            armed: false,
            state: safe.boot.pack(),
            tag: ScrTag::User,
        };
        let (snapshot, _) = watch::channel(initial);

        Ok(Self {
            output,
            mapping,
            policy,
            safe,
            current: safe.boot,
            requested: safe.boot,
            tag: ScrTag::User,
            armed: false,
            last_rejection: None,
            snapshot,
        })
    }

    // ── Accessors ──

    #[inline]
    pub const fn current(&self) -> RelayVector {
        self.current
    }

    #[inline]
    pub const fn requested(&self) -> RelayVector {
        self.requested
    }

    #[inline]
    pub const fn tag(&self) -> ScrTag {
        self.tag
    }

    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_rejection(&self) -> Option<&Rejection> {
        self.last_rejection.as_ref()
    }

    pub const fn safe_states(&self) -> &SafeStates {
        &self.safe
    }

    pub const fn mapping(&self) -> &GpioMapping {
        &self.mapping
    }

    /// Side-effect-free snapshot for telemetry.
    pub fn telemetry(&self) -> RelayTelemetry {
        RelayTelemetry {
            armed: self.armed,
            state: self.current.pack(),
            tag: self.tag,
        }
    }

    /// Receiver of every published snapshot. Readable while a sequence
    /// holds the state machine.
    pub fn subscribe(&self) -> watch::Receiver<RelayTelemetry> {
        self.snapshot.subscribe()
    }

    // ── Mode ──

    pub fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            info!("ARMED");
            self.publish();
        }
    }

    /// Commit the closed state, then clear the armed flag.
    pub fn disarm(&mut self) -> UpdateOutcome {
        let outcome = if self.current != self.safe.closed {
            info!("Setting closed state");
            self.force_state(self.safe.closed, ScrTag::User)
        } else {
            UpdateOutcome::Unchanged
        };
        if self.armed {
            self.armed = false;
            info!("DISARMED");
            self.publish();
        }
        outcome
    }

    // ── SCR pipeline ──

    /// Stage a request. No I/O.
    pub fn request_state(&mut self, vector: RelayVector, tag: ScrTag) {
        self.requested = vector;
        self.tag = tag;
    }

    /// Validate and apply the pending request.
    pub fn update(&mut self) -> UpdateOutcome {
        if self.requested == self.current {
            return UpdateOutcome::Unchanged;
        }
        if !self.armed {
            return self.reject(Rejection::Disarmed);
        }
        self.commit()
    }

    /// Interlock-checked commit that ignores the armed gate.
    pub fn force_state(&mut self, vector: RelayVector, tag: ScrTag) -> UpdateOutcome {
        self.request_state(vector, tag);
        if self.requested == self.current {
            self.publish();
            return UpdateOutcome::Unchanged;
        }
        self.commit()
    }

    fn commit(&mut self) -> UpdateOutcome {
        if let Err(violation) = self.policy.check(&self.requested) {
            return self.reject(violation.into());
        }

        let target = self.requested;
        let mut writes = 0;
        for i in 0..RELAY_COUNT {
            let on = target.get(i);
            if self.current.get(i) == on {
                continue;
            }
            let pin = self.mapping.pin(i);
            if let Err(e) = self.output.set(pin, on.into()) {
                error!(relay = self.mapping.name(i), pin, error = %e, "Relay write failed, commit aborted");
                return self.reject(e.into());
            }
            self.current.set(i, on);
            writes += 1;
            debug!(relay = self.mapping.name(i), pin, on, "Relay driven");
        }

        info!(tag = %self.tag, state = %self.current, "SCR approved");
        self.publish();
        UpdateOutcome::Committed { writes }
    }

    fn reject(&mut self, reason: Rejection) -> UpdateOutcome {
        warn!(tag = %self.tag, requested = %self.requested, %reason, "SCR rejected");
        self.requested = self.current;
        self.tag = ScrTag::Rejected;
        self.last_rejection = Some(reason.clone());
        self.publish();
        UpdateOutcome::Rejected(reason)
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.telemetry());
    }
}

impl std::fmt::Debug for RelayStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStateMachine")
            .field("backend", &self.output.name())
            .field("current", &self.current)
            .field("requested", &self.requested)
            .field("tag", &self.tag)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}
