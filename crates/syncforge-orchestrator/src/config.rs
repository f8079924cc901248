/// Tunables for the Orchestrator (C6): per-entity shard count, lock and
/// dispatch timeouts, and the sweep cadence that drains the queue.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub shard_count: usize,
    pub lock_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    pub dispatch_timeout_ms: u64,
    /// Conflict resolution strategy consulted first when `synchronize`
    /// detects conflicts (spec.md §4.3's pluggable-strategy note).
    pub default_resolution_strategy: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            shard_count: 64,
            lock_timeout_ms: 2_000,
            sweep_interval_ms: 60_000,
            dispatch_timeout_ms: 5_000,
            default_resolution_strategy: "priority_based".to_string(),
        }
    }
}
