//! Interlock policy: mutual-exclusion / mutual-inclusion rules.
//!
//! Rules come from `[[interlocks]]` and are resolved to relay indices once,
//! at startup. `check` is pure and total over every `RelayVector`; the first
//! violated rule (in configuration order) is reported.

use core::fmt;

use gse_common::config::ConfigError;
use gse_common::controller::{InterlockRuleConfig, Relation, RelayRef};
use gse_common::gpio::GpioMapping;
use gse_common::relay::RelayVector;
use thiserror::Error;

/// Interlock rule resolved against the GPIO mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterlockRule {
    pub relation: Relation,
    pub a: usize,
    pub b: usize,
    a_name: String,
    b_name: String,
}

impl InterlockRule {
    /// Rule between two relay indices, named after the indices.
    pub fn new(relation: Relation, a: usize, b: usize) -> Self {
        Self {
            relation,
            a,
            b,
            a_name: format!("relay {a}"),
            b_name: format!("relay {b}"),
        }
    }

    pub fn mutually_exclusive(a: usize, b: usize) -> Self {
        Self::new(Relation::MutuallyExclusive, a, b)
    }

    pub fn mutually_inclusive(a: usize, b: usize) -> Self {
        Self::new(Relation::MutuallyInclusive, a, b)
    }

    /// Whether `state` satisfies this rule.
    #[inline]
    pub fn holds(&self, state: &RelayVector) -> bool {
        let (a, b) = (state.get(self.a), state.get(self.b));
        match self.relation {
            Relation::MutuallyExclusive => !(a && b),
            Relation::MutuallyInclusive => a == b,
        }
    }

    fn violation(&self) -> InterlockViolation {
        InterlockViolation {
            relation: self.relation,
            a: self.a,
            b: self.b,
            a_name: self.a_name.clone(),
            b_name: self.b_name.clone(),
        }
    }
}

/// A requested state breaks an interlock rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Mutual {kind} violation for {a_name} ({a}) and {b_name} ({b})", kind = RelationName(*relation))]
pub struct InterlockViolation {
    pub relation: Relation,
    pub a: usize,
    pub b: usize,
    pub a_name: String,
    pub b_name: String,
}

struct RelationName(Relation);

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            Relation::MutuallyExclusive => "exclusion",
            Relation::MutuallyInclusive => "inclusion",
        })
    }
}

/// Immutable rule set checked before every commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterlockPolicy {
    rules: Vec<InterlockRule>,
}

impl InterlockPolicy {
    pub fn new(rules: Vec<InterlockRule>) -> Self {
        Self { rules }
    }

    /// Policy without rules; every vector passes.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Resolve `[[interlocks]]` entries against the relay table.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` if a reference does not name a relay,
    /// is out of range, or pairs a relay with itself.
    pub fn from_config(
        rules: &[InterlockRuleConfig],
        mapping: &GpioMapping,
    ) -> Result<Self, ConfigError> {
        let resolve = |r: &RelayRef, rule_idx: usize| -> Result<usize, ConfigError> {
            match r {
                RelayRef::Index(i) if RelayVector::is_valid_position(*i) => Ok(*i),
                RelayRef::Index(i) => Err(ConfigError::ValidationError(format!(
                    "interlock {rule_idx}: relay index {i} out of range"
                ))),
                RelayRef::Name(name) => mapping.position_of(name).ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "interlock {rule_idx}: unknown relay '{name}'"
                    ))
                }),
            }
        };

        let mut resolved = Vec::with_capacity(rules.len());
        for (idx, rule) in rules.iter().enumerate() {
            let a = resolve(&rule.a, idx)?;
            let b = resolve(&rule.b, idx)?;
            if a == b {
                return Err(ConfigError::ValidationError(format!(
                    "interlock {idx}: relay {a} paired with itself"
                )));
            }
            resolved.push(InterlockRule {
                relation: rule.relation,
                a,
                b,
                a_name: mapping.name(a).to_string(),
                b_name: mapping.name(b).to_string(),
            });
        }
        Ok(Self { rules: resolved })
    }

    pub fn rules(&self) -> &[InterlockRule] {
        &self.rules
    }

    /// Validate `requested` against every rule, in order.
    pub fn check(&self, requested: &RelayVector) -> Result<(), InterlockViolation> {
        match self.rules.iter().find(|rule| !rule.holds(requested)) {
            Some(rule) => Err(rule.violation()),
            None => Ok(()),
        }
    }
}
