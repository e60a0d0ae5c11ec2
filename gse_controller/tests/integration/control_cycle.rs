//! Actuator and telemetry cycles driven end to end.

use std::time::Duration;

use gse_common::controller::ControllerVariant;
use gse_common::relay::{PinLevel, ScrTag};
use gse_controller::cycle::TelemetryCycle;
use gse_controller::io::sensors::SimulatedSensors;
use gse_controller::state::Rejection;
use serde_json::Value;
use tokio::time::Instant;

use super::support::{RecordingSink, command, fill, pulse_command, rig};

// ── Helpers ──

const FILL_AUX: usize = 9;
const FILL_AUX_PIN: u8 = 4;
const OX_VENT: usize = 5;
const DUMP_A: usize = 7;

// ── Tests ──

#[tokio::test(start_paused = true)]
async fn armed_command_commits_requested_state() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);

    rig.send(command(true, closed.with(FILL_AUX, true))).await;

    assert_eq!(rig.current().await, closed.with(FILL_AUX, true));
    assert_eq!(rig.log.writes(), vec![(FILL_AUX_PIN, PinLevel::High)]);
    let snapshot = *rig.relay_rx.borrow();
    assert!(snapshot.armed);
    assert_eq!(snapshot.tag, ScrTag::User);
    assert_eq!(snapshot.state, closed.with(FILL_AUX, true).pack());
}

#[tokio::test(start_paused = true)]
async fn disarm_command_closes_and_rejects_request() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);

    rig.send(command(true, closed.with(FILL_AUX, true))).await;
    rig.send(command(false, closed.with(FILL_AUX, true).with(0, false))).await;

    let sm = rig.relays.lock().await;
    assert!(!sm.is_armed());
    assert_eq!(sm.current(), closed);
    assert_eq!(sm.tag(), ScrTag::Rejected);
    assert_eq!(sm.last_rejection(), Some(&Rejection::Disarmed));
}

#[tokio::test(start_paused = true)]
async fn command_while_disarmed_changes_nothing() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);

    rig.send(command(false, closed.with(FILL_AUX, true))).await;

    assert_eq!(rig.current().await, closed);
    assert!(rig.log.is_empty());
    assert_eq!(rig.relay_rx.borrow().tag, ScrTag::Rejected);
}

#[tokio::test(start_paused = true)]
async fn interlocked_commands_are_rejected() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);

    // OX_VENT with OX_FILL already open.
    rig.send(command(true, closed.with(OX_VENT, true))).await;
    {
        let sm = rig.relays.lock().await;
        assert_eq!(sm.current(), closed);
        assert!(matches!(sm.last_rejection(), Some(Rejection::Interlock(_))));
    }

    // DUMP_A without DUMP_B.
    rig.send(command(true, closed.with(DUMP_A, true))).await;
    {
        let sm = rig.relays.lock().await;
        assert_eq!(sm.current(), closed);
        let Some(Rejection::Interlock(violation)) = sm.last_rejection() else {
            panic!("expected interlock rejection, got {:?}", sm.last_rejection());
        };
        assert_eq!(
            violation.to_string(),
            "Mutual inclusion violation for DUMP_A (7) and DUMP_B (8)"
        );
    }
    assert!(rig.log.is_empty());

    rig.send(command(true, closed.with(DUMP_A, true).with(DUMP_A + 1, true))).await;
    assert_eq!(rig.log.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pulse_command_flips_then_restores() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);
    rig.send(command(true, closed)).await;

    let start = Instant::now();
    rig.send(pulse_command(closed, FILL_AUX, 200)).await;

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(
        rig.log.writes(),
        vec![(FILL_AUX_PIN, PinLevel::High), (FILL_AUX_PIN, PinLevel::Low)]
    );
    assert_eq!(rig.current().await, closed);
}

#[tokio::test(start_paused = true)]
async fn pulse_of_unknown_relay_still_applies_state() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);
    rig.send(command(true, closed)).await;

    rig.send(pulse_command(closed.with(FILL_AUX, true), 42, 200)).await;

    assert_eq!(rig.log.writes(), vec![(FILL_AUX_PIN, PinLevel::High)]);
}

#[tokio::test(start_paused = true)]
async fn command_dropped_while_relays_owned() {
    let loaded = fill();
    let closed = loaded.safe_states.closed;
    let mut rig = rig(&loaded);
    rig.send(command(true, closed)).await;

    let held = rig.relays.clone().lock_owned().await;
    let mut cmd = command(true, closed.with(FILL_AUX, true));
    cmd.redlines_armed = true;
    rig.send(cmd).await;
    drop(held);

    assert_eq!(rig.current().await, closed);
    assert!(rig.log.is_empty());
    assert!(rig.supervisor.lock().redlines_armed());

    // Nothing queued: the next cycle has no command to replay.
    rig.actuator.step().await;
    assert_eq!(rig.current().await, closed);
}

#[tokio::test(start_paused = true)]
async fn telemetry_frame_reflects_relays_and_sensors() {
    let loaded = fill();
    let rig = rig(&loaded);
    let sensors = SimulatedSensors::new();
    sensors.set_channel(1, 42.0);
    let sink = RecordingSink::default();
    let mut telemetry = TelemetryCycle::new(
        ControllerVariant::Fill,
        rig.relay_rx.clone(),
        rig.supervisor.clone(),
        Box::new(sensors.clone()),
        Box::new(sink.clone()),
    );

    telemetry.step();
    rig.relays.lock().await.arm();
    tokio::time::advance(Duration::from_millis(500)).await;
    telemetry.step();

    let frames = sink.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["fc_timestamp"], Value::from(0.0));
    assert_eq!(frames[0]["fc_soft_armed"], Value::from(false));
    assert_eq!(frames[0]["fc_state"], Value::from(loaded.safe_states.closed.pack()));
    assert_eq!(frames[0]["fc_scr_tag"], Value::from(ScrTag::User.code()));
    assert_eq!(frames[0]["fc_adc1_c2"], Value::from(42.0));
    assert_eq!(frames[0]["fc_hard_armed"], Value::from(false));
    assert_eq!(frames[1]["fc_timestamp"], Value::from(0.5));
    assert_eq!(frames[1]["fc_soft_armed"], Value::from(true));
}

#[tokio::test(start_paused = true)]
async fn telemetry_readable_while_relays_owned() {
    let loaded = fill();
    let rig = rig(&loaded);
    let sink = RecordingSink::default();
    let mut telemetry = TelemetryCycle::new(
        ControllerVariant::Fill,
        rig.relay_rx.clone(),
        rig.supervisor.clone(),
        Box::new(SimulatedSensors::new()),
        Box::new(sink.clone()),
    );

    let _held = rig.relays.clone().lock_owned().await;
    telemetry.step();

    assert_eq!(sink.frames().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_send_still_checks_redlines() {
    let loaded = fill();
    let rig = rig(&loaded);
    let sensors = SimulatedSensors::new();
    sensors.set_channel(1, 950.0);
    rig.supervisor.lock().set_redlines_armed(true);
    let mut telemetry = TelemetryCycle::new(
        ControllerVariant::Fill,
        rig.relay_rx.clone(),
        rig.supervisor.clone(),
        Box::new(sensors),
        Box::new(RecordingSink::failing()),
    );

    telemetry.step();
    telemetry.step();

    let action = rig.supervisor.lock().take_action().unwrap();
    assert_eq!(action.tag, ScrTag::Redline);
}
