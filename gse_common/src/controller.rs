//! Controller configuration structures.
//!
//! All config types use `serde::Deserialize` for TOML loading. Optional
//! sections fall back to the defaults in [`crate::consts`]. Cross-field
//! validation (interlock references, safe-state checks) lives in the
//! controller crate, which owns the interlock policy.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{
    ACTUATOR_PERIOD_MS_DEFAULT, BLEED_POSITION_DEFAULT, DEGRADED_THRESHOLD_DEFAULT,
    NETWORK_PERIOD_S_DEFAULT, NETWORK_TIMEOUT_S_DEFAULT, PROBE_DEADLINE_S_DEFAULT,
    TELEMETRY_PERIOD_MS_DEFAULT, VENT_SETTLE_MS_DEFAULT,
};
use crate::gpio::PinId;
use crate::relay::RelayVector;

// ─── Variant ────────────────────────────────────────────────────────

/// Which board this controller drives. Selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerVariant {
    /// Fill controller (ground fill and vent plumbing).
    Fill,
    /// Propulsion controller (engine valves and igniter).
    Prop,
}

impl ControllerVariant {
    /// Prefix of every command and telemetry key (`fc` / `pc`).
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Fill => "fc",
            Self::Prop => "pc",
        }
    }

    /// Full key for a command or telemetry field, e.g. `pc_state`.
    pub fn key(self, field: &str) -> String {
        format!("{}_{field}", self.prefix())
    }

    /// Only the prop board carries an igniter.
    pub const fn supports_ignition(self) -> bool {
        matches!(self, Self::Prop)
    }
}

// ─── Relays & Interlocks ────────────────────────────────────────────

/// One entry of the ordered `[[relays]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Valve / device name used in logs and interlock rules.
    pub name: String,
    /// Output pin driving the relay coil.
    pub pin: PinId,
}

/// Reference to a relay from an interlock rule: by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayRef {
    Index(usize),
    Name(String),
}

/// Relation enforced between two relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// The two relays must never both be powered.
    MutuallyExclusive,
    /// The two relays must always agree.
    MutuallyInclusive,
}

/// `[[interlocks]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterlockRuleConfig {
    pub relation: Relation,
    pub a: RelayRef,
    pub b: RelayRef,
}

// ─── Named States ───────────────────────────────────────────────────

/// `[states]` section: boot, closed and vent vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Vector driven at startup without validation. Defaults to `closed`.
    #[serde(default)]
    pub boot: Option<RelayVector>,
    /// Safe state with every valve closed. Entered on disarm.
    pub closed: RelayVector,
    /// Venting state. Entered on confirmed loss of ground control.
    pub vent: RelayVector,
    /// Relay flipped once the vent state has settled.
    #[serde(default = "default_bleed_position")]
    pub bleed_position: usize,
    /// Pause between entering the vent state and the bleed flip [ms].
    #[serde(default = "default_vent_settle_ms")]
    pub vent_settle_ms: u64,
}

impl StateConfig {
    pub fn boot_state(&self) -> RelayVector {
        self.boot.unwrap_or(self.closed)
    }
}

fn default_bleed_position() -> usize {
    BLEED_POSITION_DEFAULT
}
fn default_vent_settle_ms() -> u64 {
    VENT_SETTLE_MS_DEFAULT
}

// ─── Network & Timing ───────────────────────────────────────────────

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ground-control host probed for reachability.
    pub ground_control: String,
    /// Local address receiving commands.
    pub command_bind: SocketAddr,
    /// Local address telemetry is sent from.
    pub telemetry_bind: SocketAddr,
    /// Ground-control telemetry endpoint.
    pub telemetry_target: SocketAddr,
    /// Network health cycle period [s].
    #[serde(default = "default_probe_period_s")]
    pub probe_period_s: u64,
    /// Deadline for a single probe [s].
    #[serde(default = "default_probe_deadline_s")]
    pub probe_deadline_s: u32,
    /// Consecutive failures tolerated before safing.
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: u32,
    /// Time without a successful probe before venting [s].
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

fn default_probe_period_s() -> u64 {
    NETWORK_PERIOD_S_DEFAULT
}
fn default_probe_deadline_s() -> u32 {
    PROBE_DEADLINE_S_DEFAULT
}
fn default_degraded_threshold() -> u32 {
    DEGRADED_THRESHOLD_DEFAULT
}
fn default_timeout_s() -> u64 {
    NETWORK_TIMEOUT_S_DEFAULT
}

/// `[timing]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Actuator update cycle period [ms].
    #[serde(default = "default_actuator_period_ms")]
    pub actuator_period_ms: u64,
    /// Telemetry cycle period [ms].
    #[serde(default = "default_telemetry_period_ms")]
    pub telemetry_period_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            actuator_period_ms: ACTUATOR_PERIOD_MS_DEFAULT,
            telemetry_period_ms: TELEMETRY_PERIOD_MS_DEFAULT,
        }
    }
}

fn default_actuator_period_ms() -> u64 {
    ACTUATOR_PERIOD_MS_DEFAULT
}
fn default_telemetry_period_ms() -> u64 {
    TELEMETRY_PERIOD_MS_DEFAULT
}

// ─── Redlines ───────────────────────────────────────────────────────

/// Safe state a safety override drives the relays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafingTarget {
    /// Configured closed state.
    Closed,
    /// Configured vent state followed by the bleed flip.
    Vent,
}

/// `[[redlines]]` entry: upper limit on one sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedlineConfig {
    /// ADC channel index (0..8).
    pub channel: usize,
    /// Reading above which the redline trips.
    pub max: f64,
    #[serde(default = "default_redline_action")]
    pub action: SafingTarget,
}

fn default_redline_action() -> SafingTarget {
    SafingTarget::Closed
}

// ─── Sequences ──────────────────────────────────────────────────────

/// One step of a timed relay procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SequenceStep {
    /// Power (`on = true`) or release one relay.
    Set { position: usize, on: bool },
    /// Pause before the next step.
    Sleep { ms: u64 },
}

impl SequenceStep {
    pub const fn set(position: usize, on: bool) -> Self {
        Self::Set { position, on }
    }

    pub const fn sleep(ms: u64) -> Self {
        Self::Sleep { ms }
    }
}

/// `[ignition]` section (prop only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnitionConfig {
    #[serde(default = "default_ignition_steps")]
    pub steps: Vec<SequenceStep>,
    /// Shutdown branch run when the sequence is aborted.
    #[serde(default = "default_ignition_abort")]
    pub abort: Vec<SequenceStep>,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            steps: default_ignition_steps(),
            abort: default_ignition_abort(),
        }
    }
}

/// Igniter 0, OMV 5, FMV 6, OPV 7, HBV 8.
pub fn default_ignition_steps() -> Vec<SequenceStep> {
    vec![
        // Power igniter.
        SequenceStep::set(0, true),
        SequenceStep::sleep(3_500),
        // Ox main valve, then fuel main 65 ms later.
        SequenceStep::set(5, true),
        SequenceStep::sleep(65),
        SequenceStep::set(6, true),
        // Burn.
        SequenceStep::sleep(14_500),
        // Ox purge.
        SequenceStep::set(7, true),
        SequenceStep::sleep(30_000),
        SequenceStep::set(7, false),
        SequenceStep::set(8, false),
        SequenceStep::sleep(30_000),
        SequenceStep::set(5, false),
        SequenceStep::set(6, false),
        SequenceStep::set(0, false),
    ]
}

pub fn default_ignition_abort() -> Vec<SequenceStep> {
    vec![
        SequenceStep::set(5, false),
        SequenceStep::sleep(20),
        SequenceStep::set(6, false),
        SequenceStep::set(0, false),
    ]
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level controller configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub variant: ControllerVariant,
    pub shared: SharedConfig,
    /// Ordered relay table; index = `RelayVector` position.
    pub relays: Vec<RelayConfig>,
    pub states: StateConfig,
    #[serde(default)]
    pub interlocks: Vec<InterlockRuleConfig>,
    pub network: NetworkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub redlines: Vec<RedlineConfig>,
    /// Ignition script; defaults apply on the prop board when absent.
    #[serde(default)]
    pub ignition: Option<IgnitionConfig>,
}
