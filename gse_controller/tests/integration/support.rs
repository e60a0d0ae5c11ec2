//! Test doubles for the controller collaborators.

use std::collections::VecDeque;
use std::sync::Arc;

use gse_common::command::{Command, PulseRequest};
use gse_common::relay::RelayVector;
use gse_common::telemetry::RelayTelemetry;
use gse_controller::config::{LoadedConfig, load_config_from_str};
use gse_controller::cycle::ActuatorCycle;
use gse_controller::io::gpio::{SimulatedOutput, WriteLog};
use gse_controller::io::{CommandSource, ConnectivityProbe, TelemetrySink, TransportError};
use gse_controller::safety::{SafetySupervisor, SharedSupervisor};
use gse_controller::sequence::{self, IgnitionSequence, SharedRelays};
use gse_controller::state::RelayStateMachine;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::Instant;

pub const FILL_TOML: &str = include_str!("../../../config/fill.toml");
pub const PROP_TOML: &str = include_str!("../../../config/prop.toml");

pub fn fill() -> LoadedConfig {
    load_config_from_str(FILL_TOML).unwrap()
}

pub fn prop() -> LoadedConfig {
    load_config_from_str(PROP_TOML).unwrap()
}

/// State machine over a recording port; boot writes cleared.
pub fn relays(loaded: &LoadedConfig) -> (RelayStateMachine, WriteLog) {
    let output = SimulatedOutput::new();
    let log = output.log();
    let sm = RelayStateMachine::new(
        loaded.mapping.clone(),
        Box::new(output),
        loaded.policy.clone(),
        loaded.safe_states,
    )
    .unwrap();
    log.clear();
    (sm, log)
}

/// Actuator cycle wired to scripted commands and a recording port.
pub struct Rig {
    pub actuator: ActuatorCycle,
    pub relays: SharedRelays,
    pub relay_rx: watch::Receiver<RelayTelemetry>,
    pub supervisor: SharedSupervisor,
    pub ignition: Option<IgnitionSequence>,
    pub commands: ScriptedCommands,
    pub log: WriteLog,
}

pub fn rig(loaded: &LoadedConfig) -> Rig {
    let (sm, log) = relays(loaded);
    let relay_rx = sm.subscribe();
    let relays = sequence::shared(sm);
    let supervisor =
        SafetySupervisor::from_config(&loaded.config, Instant::now().into_std()).into_shared();
    let ignition = loaded.ignition.clone().map(IgnitionSequence::new);
    let commands = ScriptedCommands::default();

    let actuator = ActuatorCycle::new(
        relays.clone(),
        relay_rx.clone(),
        supervisor.clone(),
        ignition.clone(),
        Box::new(commands.clone()),
    );
    Rig {
        actuator,
        relays,
        relay_rx,
        supervisor,
        ignition,
        commands,
        log,
    }
}

impl Rig {
    /// Queue `command` and run one actuator cycle.
    pub async fn send(&mut self, command: Command) {
        self.commands.push(command);
        self.actuator.step().await;
    }

    pub async fn current(&self) -> RelayVector {
        self.relays.lock().await.current()
    }
}

pub fn command(soft_armed: bool, state: RelayVector) -> Command {
    Command {
        soft_armed,
        redlines_armed: false,
        state,
        pulse: None,
        fire: false,
    }
}

pub fn pulse_command(state: RelayVector, position: usize, delay_ms: u64) -> Command {
    Command {
        pulse: Some(PulseRequest { position, delay_ms }),
        ..command(true, state)
    }
}

pub fn fire_command(state: RelayVector) -> Command {
    Command {
        fire: true,
        ..command(true, state)
    }
}

/// Command source fed from a shared queue, one command per poll.
#[derive(Clone, Default)]
pub struct ScriptedCommands(Arc<Mutex<VecDeque<Command>>>);

impl ScriptedCommands {
    pub fn push(&self, command: Command) {
        self.0.lock().push_back(command);
    }
}

impl CommandSource for ScriptedCommands {
    fn poll_command(&mut self) -> Option<Command> {
        self.0.lock().pop_front()
    }
}

/// Sink keeping every frame; optionally failing every send.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Map<String, Value>>>>,
    failing: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<Map<String, Value>> {
        self.frames.lock().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn send(&mut self, frame: &Map<String, Value>) -> Result<(), TransportError> {
        if self.failing {
            let err = serde_json::from_str::<Value>("{").unwrap_err();
            return Err(TransportError::Encode(err));
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

/// Probe answering from a shared queue; reachable once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedProbe(Arc<Mutex<VecDeque<bool>>>);

impl ScriptedProbe {
    pub fn push(&self, ok: bool) {
        self.0.lock().push_back(ok);
    }
}

impl ConnectivityProbe for ScriptedProbe {
    async fn probe(&self) -> bool {
        self.0.lock().pop_front().unwrap_or(true)
    }
}
