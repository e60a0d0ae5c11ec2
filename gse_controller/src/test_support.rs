//! Fixtures shared by the unit tests of the relay and sequence modules.

use std::time::Duration;

use gse_common::consts::RELAY_COUNT;
use gse_common::controller::RelayConfig;
use gse_common::gpio::{GpioMapping, PinId};
use gse_common::relay::RelayVector;

use crate::interlock::InterlockPolicy;
use crate::io::gpio::{SimulatedOutput, WriteLog};
use crate::state::{RelayStateMachine, SafeStates};

/// Fill board wiring, in relay order.
pub const BOARD_PINS: [PinId; RELAY_COUNT] = [13, 6, 5, 11, 9, 10, 22, 27, 17, 4];

fn mapping_on(pins: impl IntoIterator<Item = PinId>) -> GpioMapping {
    let relays: Vec<_> = pins
        .into_iter()
        .enumerate()
        .map(|(i, pin)| RelayConfig {
            name: format!("R{i}"),
            pin,
        })
        .collect();
    GpioMapping::from_relays(&relays).unwrap()
}

/// Mapping where relay `i` drives pin `i`.
pub fn identity_mapping() -> GpioMapping {
    mapping_on(0..RELAY_COUNT as PinId)
}

/// Mapping over [`BOARD_PINS`].
pub fn board_mapping() -> GpioMapping {
    mapping_on(BOARD_PINS)
}

/// Prop-style safe states: all-off closed, vent opening relays 2 and 4.
pub fn safe_states() -> SafeStates {
    SafeStates {
        boot: RelayVector::all_off(),
        closed: RelayVector::all_off(),
        vent: RelayVector::from_bits([0, 0, 1, 0, 1, 0, 0, 0, 0, 0]),
        bleed_position: 1,
        vent_settle: Duration::from_millis(500),
    }
}

fn build(
    mapping: GpioMapping,
    output: SimulatedOutput,
    policy: InterlockPolicy,
    safe: SafeStates,
) -> (RelayStateMachine, WriteLog) {
    let log = output.log();
    let sm = RelayStateMachine::new(mapping, Box::new(output), policy, safe).unwrap();
    log.clear();
    (sm, log)
}

/// Disarmed machine over a recording port, boot writes already cleared.
pub fn machine(policy: InterlockPolicy) -> (RelayStateMachine, WriteLog) {
    machine_on(SimulatedOutput::new(), policy)
}

/// Like [`machine`], over a caller-configured port.
pub fn machine_on(output: SimulatedOutput, policy: InterlockPolicy) -> (RelayStateMachine, WriteLog) {
    build(identity_mapping(), output, policy, safe_states())
}

/// Disarmed machine on [`board_mapping`] with custom safe states.
pub fn board_machine(policy: InterlockPolicy, safe: SafeStates) -> (RelayStateMachine, WriteLog) {
    build(board_mapping(), SimulatedOutput::new(), policy, safe)
}
