//! Redline evaluation: upper limits on sensor channels.

use gse_common::consts::ADC_CHANNELS;
use gse_common::controller::{RedlineConfig, SafingTarget};
use gse_common::telemetry::{SensorSnapshot, channel_key};
use tracing::error;

#[derive(Debug, Clone, Default)]
pub struct RedlineMonitor {
    rules: Vec<RedlineConfig>,
}

impl RedlineMonitor {
    /// Rules with a channel outside the ADC range are dropped; the
    /// configuration loader rejects them before this point.
    pub fn new(rules: &[RedlineConfig]) -> Self {
        Self {
            rules: rules
                .iter()
                .filter(|r| r.channel < ADC_CHANNELS)
                .copied()
                .collect(),
        }
    }

    pub fn rules(&self) -> &[RedlineConfig] {
        &self.rules
    }

    /// Most severe action among breached redlines.
    pub fn evaluate(&self, snapshot: &SensorSnapshot) -> Option<SafingTarget> {
        self.rules
            .iter()
            .filter(|rule| {
                let reading = snapshot.channels[rule.channel];
                let breached = reading > rule.max;
                if breached {
                    error!(
                        channel = %channel_key(rule.channel),
                        reading,
                        max = rule.max,
                        action = ?rule.action,
                        "REDLINE exceeded"
                    );
                }
                breached
            })
            .map(|rule| rule.action)
            .max()
    }
}
