use crate::alerts::Thresholds;

/// Tunables for the Sync Monitor (C7): how often thresholds are
/// re-evaluated and adapters are polled for health, plus the thresholds
/// themselves.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub tick_interval_ms: u64,
    pub health_check_interval_ms: u64,
    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10_000,
            health_check_interval_ms: 30_000,
            thresholds: Thresholds::default(),
        }
    }
}
