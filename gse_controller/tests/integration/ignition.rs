//! Prop ignition sequence driven by fire commands.

use std::time::Duration;

use gse_common::controller::SafingTarget;
use gse_common::relay::{PinLevel, RelayVector, ScrTag};
use gse_controller::cycle::{Controller, ControllerIo};
use gse_controller::io::probe::AlwaysReachable;
use gse_controller::io::sensors::SimulatedSensors;
use gse_controller::safety::SafingAction;
use tokio::time::sleep;

use super::support::{
    RecordingSink, Rig, ScriptedCommands, command, fire_command, prop, relays, rig,
};

// ── Helpers ──

const IGN: usize = 0;
const OMV: usize = 5;
const FMV: usize = 6;

async fn armed_rig() -> (Rig, RelayVector) {
    let loaded = prop();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);
    rig.send(command(true, closed)).await;
    (rig, closed)
}

fn ignition_active(rig: &Rig) -> bool {
    rig.ignition.as_ref().is_some_and(|i| i.is_active())
}

fn snapshot_state(rig: &Rig) -> RelayVector {
    let packed = rig.relay_rx.borrow().state;
    RelayVector::unpack(u64::from(packed)).unwrap()
}

// ── Tests ──

#[tokio::test(start_paused = true)]
async fn full_sequence_runs_to_completion() {
    let (mut rig, closed) = armed_rig().await;

    rig.send(fire_command(closed)).await;
    sleep(Duration::from_millis(1)).await;
    assert!(ignition_active(&rig));
    assert_eq!(snapshot_state(&rig), closed.with(IGN, true));
    assert_eq!(rig.relay_rx.borrow().tag, ScrTag::Ignition);

    sleep(Duration::from_secs(80)).await;

    assert!(!ignition_active(&rig));
    assert_eq!(rig.current().await, closed);
    assert_eq!(
        rig.log.writes(),
        vec![
            (4, PinLevel::High),
            (9, PinLevel::High),
            (11, PinLevel::High),
            (5, PinLevel::High),
            (5, PinLevel::Low),
            (4, PinLevel::Low),
            (9, PinLevel::Low),
            (11, PinLevel::Low),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn second_fire_runs_abort_branch() {
    let (mut rig, closed) = armed_rig().await;

    rig.send(fire_command(closed)).await;
    sleep(Duration::from_millis(3600)).await;
    assert_eq!(snapshot_state(&rig), closed.with(IGN, true).with(OMV, true).with(FMV, true));

    rig.send(fire_command(closed)).await;
    sleep(Duration::from_millis(100)).await;

    assert!(!ignition_active(&rig));
    let sm = rig.relays.lock().await;
    assert_eq!(sm.current(), closed);
    assert!(sm.is_armed());
    drop(sm);

    // OMV closes 20 ms before FMV and the igniter.
    let writes = rig.log.writes();
    assert_eq!(
        &writes[writes.len() - 3..],
        &[(9, PinLevel::Low), (4, PinLevel::Low), (11, PinLevel::Low)]
    );
}

#[tokio::test(start_paused = true)]
async fn fire_while_disarmed_is_ignored() {
    let loaded = prop();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);

    // Fire is evaluated before the arm flag of the same command.
    rig.send(fire_command(closed)).await;
    sleep(Duration::from_secs(1)).await;

    assert!(!ignition_active(&rig));
    assert!(rig.relay_rx.borrow().armed);
    assert!(rig.log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn commands_dropped_while_ignition_owns_relays() {
    let (mut rig, closed) = armed_rig().await;

    rig.send(fire_command(closed)).await;
    sleep(Duration::from_millis(100)).await;
    rig.send(command(false, closed)).await;

    assert!(ignition_active(&rig));
    assert!(rig.relay_rx.borrow().armed);
    assert_eq!(snapshot_state(&rig), closed.with(IGN, true));
}

#[tokio::test(start_paused = true)]
async fn safing_during_ignition_aborts_then_applies() {
    let (mut rig, closed) = armed_rig().await;

    rig.send(fire_command(closed)).await;
    sleep(Duration::from_millis(4000)).await;

    rig.supervisor.lock().queue(SafingAction {
        target: SafingTarget::Closed,
        tag: ScrTag::AutoSafe,
    });
    rig.actuator.step().await;
    sleep(Duration::from_millis(100)).await;
    assert!(!ignition_active(&rig));

    rig.actuator.step().await;
    let sm = rig.relays.lock().await;
    assert_eq!(sm.current(), closed);
    assert_eq!(sm.tag(), ScrTag::AutoSafe);
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_ignition_and_disarms() {
    let loaded = prop();
    let closed = loaded.safe_states.closed;
    let (sm, log) = relays(&loaded);
    let commands = ScriptedCommands::default();
    commands.push(command(true, closed));
    commands.push(fire_command(closed));
    let sink = RecordingSink::default();

    let controller = Controller::new(
        &loaded,
        sm,
        ControllerIo {
            commands: Box::new(commands),
            sensors: Box::new(SimulatedSensors::new()),
            telemetry: Box::new(sink.clone()),
            probe: AlwaysReachable,
        },
    );
    let relays = controller.relays();

    controller.run(sleep(Duration::from_secs(5))).await;

    let sm = relays.lock().await;
    assert!(!sm.is_armed());
    assert_eq!(sm.current(), closed);
    assert_eq!(log.last_level(4), Some(PinLevel::Low));
    assert_eq!(log.last_level(9), Some(PinLevel::Low));

    let frames = sink.frames();
    assert!(frames.len() >= 10);
    assert!(frames.iter().any(|f| f["pc_soft_armed"] == true));
}
