//! Controller-wide constants.
//!
//! Defaults here are used when the corresponding configuration key is absent.

use static_assertions::const_assert;

/// Number of relay channels on a controller board.
pub const RELAY_COUNT: usize = 10;

/// Number of ADC channels reported in telemetry (2 ADCs x 4 channels).
pub const ADC_CHANNELS: usize = 8;

// The packed relay state travels as a u16.
const_assert!(RELAY_COUNT <= 16);
const_assert!(RELAY_COUNT > 0);

// ─── Cycle Periods ──────────────────────────────────────────────────

/// Actuator update cycle period [ms].
pub const ACTUATOR_PERIOD_MS_DEFAULT: u64 = 500;
/// Telemetry cycle period [ms].
pub const TELEMETRY_PERIOD_MS_DEFAULT: u64 = 500;
/// Network health cycle period [s].
pub const NETWORK_PERIOD_S_DEFAULT: u64 = 10;

/// Shortest accepted cycle period [ms].
pub const PERIOD_MS_MIN: u64 = 10;
/// Longest accepted cycle period [ms].
pub const PERIOD_MS_MAX: u64 = 60_000;

// ─── Network Supervision ────────────────────────────────────────────

/// Consecutive probe failures tolerated before safing starts.
pub const DEGRADED_THRESHOLD_DEFAULT: u32 = 1;
/// Time without a successful probe before venting [s].
pub const NETWORK_TIMEOUT_S_DEFAULT: u64 = 600;
/// Deadline handed to a single reachability probe [s].
pub const PROBE_DEADLINE_S_DEFAULT: u32 = 10;

// ─── Sequences ──────────────────────────────────────────────────────

/// Pause between the vent state and the bleed-valve flip [ms].
pub const VENT_SETTLE_MS_DEFAULT: u64 = 500;
/// Relay flipped after the vent pause.
pub const BLEED_POSITION_DEFAULT: usize = 1;
/// Upper bound for a commanded pulse delay [ms].
pub const PULSE_DELAY_MS_MAX: u64 = 60_000;
