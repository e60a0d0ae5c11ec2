//! Control cycles: actuator, telemetry, network health.
//!
//! ```text
//!   actuator  (500 ms): safing action → one command → update()
//!                       (a cycle that safes drops the command's relay requests)
//!   telemetry (500 ms): sensors → redlines → frame → sink
//!   network   (10 s)  : probe → supervisor
//! ```
//!
//! Each cycle runs as its own tokio task. The actuator cycle only ever
//! `try_lock`s the relays, so it keeps running (and can deliver an ignition
//! abort) while a sequence holds them. Telemetry reads the relay snapshot
//! from a watch channel and never takes the relay lock.

use std::future::Future;
use std::time::Duration;

use gse_common::prelude::{Command, ControllerVariant, RelayTelemetry, ScrTag, TelemetryFrame};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::config::LoadedConfig;
use crate::io::{CommandSource, ConnectivityProbe, SensorSource, TelemetrySink};
use crate::safety::{SafetySupervisor, SharedSupervisor};
use crate::sequence::{self, IgnitionSequence, SharedRelays, ToggleOutcome};
use crate::state::{RelayStateMachine, UpdateOutcome};

// ─── Collaborators ──────────────────────────────────────────────────

/// Concrete backends handed to the controller by `main` or a test.
pub struct ControllerIo<P> {
    pub commands: Box<dyn CommandSource>,
    pub sensors: Box<dyn SensorSource>,
    pub telemetry: Box<dyn TelemetrySink>,
    pub probe: P,
}

// ─── Actuator Cycle ─────────────────────────────────────────────────

pub struct ActuatorCycle {
    relays: SharedRelays,
    relay_rx: watch::Receiver<RelayTelemetry>,
    supervisor: SharedSupervisor,
    ignition: Option<IgnitionSequence>,
    commands: Box<dyn CommandSource>,
}

impl ActuatorCycle {
    pub fn new(
        relays: SharedRelays,
        relay_rx: watch::Receiver<RelayTelemetry>,
        supervisor: SharedSupervisor,
        ignition: Option<IgnitionSequence>,
        commands: Box<dyn CommandSource>,
    ) -> Self {
        Self {
            relays,
            relay_rx,
            supervisor,
            ignition,
            commands,
        }
    }

    /// One actuator cycle.
    pub async fn step(&mut self) {
        let safed = self.apply_safing().await;

        let command = self.commands.poll_command();
        match command {
            Some(command) => self.process(command, safed).await,
            None => {
                if let Ok(mut sm) = self.relays.try_lock() {
                    sm.update();
                }
            }
        }
    }

    /// Apply the queued safing action. `true` if it reached the relays.
    async fn apply_safing(&mut self) -> bool {
        let action = self.supervisor.lock().take_action();
        let Some(action) = action else {
            return false;
        };

        match self.relays.try_lock() {
            Ok(mut sm) => {
                let outcome =
                    sequence::apply_safing(&mut sm, action.target, action.tag).await;
                info!(target_state = ?action.target, tag = %action.tag, ?outcome, "Safing applied");
                true
            }
            Err(_) => {
                if let Some(ignition) = &self.ignition {
                    if ignition.abort() {
                        warn!(target_state = ?action.target, "Safing requested during ignition, aborting sequence");
                    }
                }
                debug!("Relays busy, safing deferred");
                self.supervisor.lock().requeue(action);
                false
            }
        }
    }

    /// Fire, pulse, arm/disarm, redline flag, then the state request.
    ///
    /// In a cycle that applied a safing action only arm/disarm and the
    /// redline flag are taken from the command.
    async fn process(&mut self, command: Command, safed: bool) {
        let locked_out = self.supervisor.lock().commands_locked_out();
        if locked_out {
            debug!("Vent latched, command ignored");
            return;
        }

        if command.fire && !safed {
            if let Some(ignition) = &self.ignition {
                let armed = self.relay_rx.borrow().armed;
                if let ToggleOutcome::Started(_) = ignition.toggle(&self.relays, armed) {
                    self.supervisor.lock().set_redlines_armed(command.redlines_armed);
                    return;
                }
            }
        }

        let Ok(mut sm) = self.relays.try_lock() else {
            debug!("Relays owned by a sequence, command dropped");
            self.supervisor.lock().set_redlines_armed(command.redlines_armed);
            return;
        };

        if let Some(pulse) = command.pulse.filter(|_| !safed) {
            sequence::pulse(&mut sm, pulse.position, Duration::from_millis(pulse.delay_ms)).await;
        }

        if command.soft_armed {
            sm.arm();
        } else {
            sm.disarm();
        }

        self.supervisor.lock().set_redlines_armed(command.redlines_armed);

        if safed {
            debug!(requested = %command.state, "Safing applied this cycle, command state dropped");
            return;
        }
        sm.request_state(command.state, ScrTag::User);
        if let UpdateOutcome::Committed { writes } = sm.update() {
            debug!(writes, state = %sm.current(), "Command state committed");
        }
    }
}

// ─── Telemetry Cycle ────────────────────────────────────────────────

pub struct TelemetryCycle {
    variant: ControllerVariant,
    relay_rx: watch::Receiver<RelayTelemetry>,
    supervisor: SharedSupervisor,
    sensors: Box<dyn SensorSource>,
    sink: Box<dyn TelemetrySink>,
    epoch: Option<Instant>,
}

impl TelemetryCycle {
    pub fn new(
        variant: ControllerVariant,
        relay_rx: watch::Receiver<RelayTelemetry>,
        supervisor: SharedSupervisor,
        sensors: Box<dyn SensorSource>,
        sink: Box<dyn TelemetrySink>,
    ) -> Self {
        Self {
            variant,
            relay_rx,
            supervisor,
            sensors,
            sink,
            epoch: None,
        }
    }

    /// Sample, check redlines, send one frame.
    pub fn step(&mut self) {
        let sensors = self.sensors.read();
        let redlines_armed = {
            let mut sup = self.supervisor.lock();
            sup.check_redlines(&sensors);
            sup.redlines_armed()
        };
        let relays = *self.relay_rx.borrow();

        let epoch = *self.epoch.get_or_insert_with(Instant::now);
        let frame = TelemetryFrame {
            timestamp: epoch.elapsed().as_secs_f64(),
            redlines_armed,
            relays,
            sensors,
        };
        let map = frame.to_map(self.variant);

        if let Err(e) = self.sink.send(&map) {
            error!(error = %e, "Network error: telemetry not sent");
        }
        if relays.armed {
            let frame = Value::Object(map);
            info!(target: "telemetry", %frame, "armed telemetry");
        }
    }
}

// ─── Network Cycle ──────────────────────────────────────────────────

pub struct NetworkCycle<P> {
    probe: P,
    supervisor: SharedSupervisor,
}

impl<P: ConnectivityProbe> NetworkCycle<P> {
    pub fn new(probe: P, supervisor: SharedSupervisor) -> Self {
        Self { probe, supervisor }
    }

    /// Probe ground control once. No relay lock is held.
    pub async fn step(&self) {
        let ok = self.probe.probe().await;
        let now = Instant::now().into_std();
        self.supervisor.lock().record_probe(ok, now);
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// Cycle periods taken from `[timing]` and `[network]`.
#[derive(Debug, Clone, Copy)]
pub struct CyclePeriods {
    pub actuator: Duration,
    pub telemetry: Duration,
    pub network: Duration,
}

impl CyclePeriods {
    pub fn from_config(loaded: &LoadedConfig) -> Self {
        Self {
            actuator: Duration::from_millis(loaded.config.timing.actuator_period_ms),
            telemetry: Duration::from_millis(loaded.config.timing.telemetry_period_ms),
            network: Duration::from_secs(loaded.config.network.probe_period_s),
        }
    }
}

/// The three cycles plus the handles needed for shutdown.
pub struct Controller<P> {
    relays: SharedRelays,
    supervisor: SharedSupervisor,
    ignition: Option<IgnitionSequence>,
    actuator: ActuatorCycle,
    telemetry: TelemetryCycle,
    network: NetworkCycle<P>,
    periods: CyclePeriods,
}

impl<P: ConnectivityProbe + 'static> Controller<P> {
    pub fn new(loaded: &LoadedConfig, relays: RelayStateMachine, io: ControllerIo<P>) -> Self {
        let relay_rx = relays.subscribe();
        let relays = sequence::shared(relays);
        let supervisor =
            SafetySupervisor::from_config(&loaded.config, Instant::now().into_std()).into_shared();
        let ignition = loaded.ignition.clone().map(IgnitionSequence::new);

        Self {
            actuator: ActuatorCycle::new(
                relays.clone(),
                relay_rx.clone(),
                supervisor.clone(),
                ignition.clone(),
                io.commands,
            ),
            telemetry: TelemetryCycle::new(
                loaded.config.variant,
                relay_rx,
                supervisor.clone(),
                io.sensors,
                io.telemetry,
            ),
            network: NetworkCycle::new(io.probe, supervisor.clone()),
            relays,
            supervisor,
            ignition,
            periods: CyclePeriods::from_config(loaded),
        }
    }

    pub fn relays(&self) -> SharedRelays {
        self.relays.clone()
    }

    pub fn supervisor(&self) -> SharedSupervisor {
        self.supervisor.clone()
    }

    /// Run every cycle until `shutdown` resolves, then abort any ignition
    /// and disarm.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let Self {
            relays,
            ignition,
            actuator,
            telemetry,
            network,
            periods,
            ..
        } = self;

        let mut tasks = JoinSet::new();
        tasks.spawn(actuator_loop(actuator, periods.actuator));
        tasks.spawn(telemetry_loop(telemetry, periods.telemetry));
        tasks.spawn(network_loop(network, periods.network));
        info!(?periods, "Control cycles running");

        tokio::select! {
            () = shutdown => info!("Initiating graceful shutdown..."),
            Some(result) = tasks.join_next() => error!(?result, "Control cycle exited unexpectedly"),
        }
        tasks.abort_all();

        if let Some(ignition) = &ignition {
            if ignition.abort() {
                warn!("Ignition running at shutdown, waiting for abort branch");
            }
        }
        let mut sm = relays.lock().await;
        sm.disarm();
        info!(state = %sm.current(), "Relays safed");
    }
}

async fn actuator_loop(mut cycle: ActuatorCycle, period: Duration) {
    let mut tick = cycle_interval(period);
    loop {
        tick.tick().await;
        cycle.step().await;
    }
}

async fn telemetry_loop(mut cycle: TelemetryCycle, period: Duration) {
    let mut tick = cycle_interval(period);
    loop {
        tick.tick().await;
        cycle.step();
    }
}

async fn network_loop<P: ConnectivityProbe>(cycle: NetworkCycle<P>, period: Duration) {
    let mut tick = cycle_interval(period);
    loop {
        tick.tick().await;
        cycle.step().await;
    }
}

fn cycle_interval(period: Duration) -> tokio::time::Interval {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}
