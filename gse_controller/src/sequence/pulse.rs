//! Valve pulse: flip one relay, hold, restore.

use std::time::Duration;

use gse_common::relay::{RelayVector, ScrTag};
use tracing::{info, warn};

use crate::state::{RelayStateMachine, UpdateOutcome};

/// Flip relay `position` for `hold`, then restore its previous value.
///
/// Both transitions are ordinary SCRs tagged `Pulse`. A rejected flip skips
/// the hold and the restore; an out-of-range position is ignored.
pub async fn pulse(relays: &mut RelayStateMachine, position: usize, hold: Duration) -> UpdateOutcome {
    if !RelayVector::is_valid_position(position) {
        warn!(position, "Pulse of unknown relay ignored");
        return UpdateOutcome::Unchanged;
    }

    let original = relays.current().get(position);
    info!(relay = relays.mapping().name(position), hold_ms = hold.as_millis() as u64, "Pulsing valve");

    relays.request_state(relays.current().with(position, !original), ScrTag::Pulse);
    let flipped = relays.update();
    if !flipped.is_committed() {
        return flipped;
    }

    tokio::time::sleep(hold).await;

    relays.request_state(relays.current().with(position, original), ScrTag::Pulse);
    relays.update()
}
