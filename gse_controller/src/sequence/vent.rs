//! Safing procedures: vent (with bleed flip) and closed.

use gse_common::controller::SafingTarget;
use gse_common::relay::ScrTag;
use tracing::{error, info};

use crate::state::{RelayStateMachine, UpdateOutcome};

/// Force the vent state, let it settle, then commit the bled vent state.
///
/// A rejected vent is returned as is; the bleed relay is left alone.
pub async fn vent(relays: &mut RelayStateMachine, tag: ScrTag) -> UpdateOutcome {
    let safe = *relays.safe_states();
    info!(%tag, "Setting vent state");
    let vented = relays.force_state(safe.vent, tag);
    if vented.is_rejected() {
        error!(%tag, state = %relays.current(), ?vented, "Vent state not reached, bleed skipped");
        return vented;
    }

    tokio::time::sleep(safe.vent_settle).await;

    relays.force_state(safe.vent_bled(), tag)
}

/// Force the closed state.
pub fn close(relays: &mut RelayStateMachine, tag: ScrTag) -> UpdateOutcome {
    info!(%tag, "Setting closed state");
    let closed = relays.safe_states().closed;
    relays.force_state(closed, tag)
}

pub async fn apply_safing(relays: &mut RelayStateMachine, target: SafingTarget, tag: ScrTag) -> UpdateOutcome {
    match target {
        SafingTarget::Vent => vent(relays, tag).await,
        SafingTarget::Closed => close(relays, tag),
    }
}
