//! Relay state vector and state-change tags.
//!
//! A `RelayVector` holds one boolean per relay channel, read left to right:
//!
//! ```text
//!  0   1   2   3   4   5   6   7   8   9
//! [__, __, __, __, __, __, __, __, __, __]
//! ```
//!
//! `true` means the relay coil is powered. The packed form used on the wire
//! puts index 0 in the most significant of the `RELAY_COUNT` bits, so the
//! bit string reads in the same order as the vector.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::RELAY_COUNT;

// ─── Pin Level ──────────────────────────────────────────────────────

/// Electrical level driven onto a relay pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLevel {
    Low,
    High,
}

impl From<bool> for PinLevel {
    #[inline]
    fn from(on: bool) -> Self {
        if on { Self::High } else { Self::Low }
    }
}

impl PinLevel {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

// ─── Relay Vector ───────────────────────────────────────────────────

/// Fixed-width relay state vector.
///
/// `Copy` on purpose: requests and commits exchange values, never aliases.
/// Deserializes from (and serializes to) a list of `0`/`1` integers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RelayVector([bool; RELAY_COUNT]);

impl RelayVector {
    /// Mask covering the valid packed bits.
    pub const PACKED_MASK: u16 = ((1u32 << RELAY_COUNT) - 1) as u16;

    /// All relays unpowered.
    pub const fn all_off() -> Self {
        Self([false; RELAY_COUNT])
    }

    pub const fn new(bits: [bool; RELAY_COUNT]) -> Self {
        Self(bits)
    }

    /// Build from 0/1 integers, e.g. `[0, 0, 1, 0, 1, 0, 0, 0, 0, 0]`.
    pub fn from_bits(bits: [u8; RELAY_COUNT]) -> Self {
        let mut out = [false; RELAY_COUNT];
        for (slot, bit) in out.iter_mut().zip(bits) {
            *slot = bit != 0;
        }
        Self(out)
    }

    /// State of relay `index`.
    ///
    /// # Panics
    /// Panics if `index >= RELAY_COUNT`. Positions coming from configuration
    /// are range-checked at load time; command positions go through
    /// [`RelayVector::is_valid_position`].
    #[inline]
    pub const fn get(&self, index: usize) -> bool {
        self.0[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, on: bool) {
        self.0[index] = on;
    }

    /// Copy with relay `index` forced to `on`.
    #[inline]
    #[must_use]
    pub fn with(mut self, index: usize, on: bool) -> Self {
        self.0[index] = on;
        self
    }

    /// Copy with relay `index` inverted.
    #[inline]
    #[must_use]
    pub fn toggled(mut self, index: usize) -> Self {
        self.0[index] = !self.0[index];
        self
    }

    #[inline]
    pub const fn is_valid_position(index: usize) -> bool {
        index < RELAY_COUNT
    }

    pub const fn as_array(&self) -> &[bool; RELAY_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Number of powered relays.
    pub fn count_on(&self) -> usize {
        self.0.iter().filter(|on| **on).count()
    }

    /// Positions whose state differs between `self` and `other`, ascending.
    pub fn changed_positions(&self, other: &Self) -> impl Iterator<Item = usize> + '_ {
        let other = *other;
        (0..RELAY_COUNT).filter(move |&i| self.0[i] != other.0[i])
    }

    /// Pack into an integer, index 0 in the most significant bit.
    pub fn pack(&self) -> u16 {
        self.0
            .iter()
            .fold(0u16, |acc, &on| (acc << 1) | u16::from(on))
    }

    /// Unpack an integer produced by [`RelayVector::pack`].
    ///
    /// Returns `None` if bits above the relay width are set.
    pub fn unpack(packed: u64) -> Option<Self> {
        if packed > u64::from(Self::PACKED_MASK) {
            return None;
        }
        let mut out = [false; RELAY_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = RELAY_COUNT - 1 - i;
            *slot = (packed >> shift) & 1 == 1;
        }
        Some(Self(out))
    }
}

impl fmt::Debug for RelayVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for RelayVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, on) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(if *on { "1" } else { "0" })?;
        }
        f.write_str("]")
    }
}

impl TryFrom<Vec<u8>> for RelayVector {
    type Error = String;

    fn try_from(bits: Vec<u8>) -> Result<Self, Self::Error> {
        if bits.len() != RELAY_COUNT {
            return Err(format!(
                "relay vector must have {RELAY_COUNT} entries, got {}",
                bits.len()
            ));
        }
        let mut out = [false; RELAY_COUNT];
        for (i, bit) in bits.into_iter().enumerate() {
            out[i] = match bit {
                0 => false,
                1 => true,
                other => return Err(format!("relay vector entry {i} must be 0 or 1, got {other}")),
            };
        }
        Ok(Self(out))
    }
}

impl From<RelayVector> for Vec<u8> {
    fn from(v: RelayVector) -> Self {
        v.0.iter().map(|on| u8::from(*on)).collect()
    }
}

// ─── SCR Tag ────────────────────────────────────────────────────────

/// Origin of the most recent state-change request.
///
/// The discriminant is the 3-bit code reported as `Xc_scr_tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ScrTag {
    /// Current state is the operator's request.
    #[default]
    User = 0,
    /// The last request was rejected; current state was kept.
    Rejected = 1,
    /// Redline-commanded state.
    Redline = 2,
    /// Auto-safing after loss of ground-control connectivity.
    AutoSafe = 3,
    /// Transient state of a valve pulse.
    Pulse = 4,
    /// Step of the ignition sequence.
    Ignition = 5,
}

impl ScrTag {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::User),
            1 => Some(Self::Rejected),
            2 => Some(Self::Redline),
            3 => Some(Self::AutoSafe),
            4 => Some(Self::Pulse),
            5 => Some(Self::Ignition),
            _ => None,
        }
    }
}

impl fmt::Display for ScrTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Rejected => "rejected",
            Self::Redline => "redline",
            Self::AutoSafe => "auto-safe",
            Self::Pulse => "pulse",
            Self::Ignition => "ignition",
        };
        write!(f, "{name} ({:03b})", self.code())
    }
}
