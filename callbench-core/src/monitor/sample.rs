use std::collections::BTreeMap;

use serde::Serialize;

/// Host-wide figures at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    /// Busy share across all cores, from counter deltas since the previous refresh.
    pub cpu_usage_percent: f64,
    pub cpu_core_count: usize,
    pub mem_total_bytes: u64,
    pub mem_used_bytes: u64,
    pub mem_used_percent: f64,
    pub load_average_1m: f64,
}

/// The sampling process itself. `rss_bytes` is what reports call "heap".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub cpu_usage_percent: f64,
}

impl ProcessSnapshot {
    pub fn rss_mb(&self) -> f64 {
        self.rss_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Record counts of the monitored data store, or why they could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DependentSnapshot {
    Counts { counts: BTreeMap<String, u64> },
    Unavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    /// Unix milliseconds, strictly increasing within a session.
    pub timestamp: u64,
    pub host: HostSnapshot,
    /// `None` when the process could not be inspected on this tick.
    pub process: Option<ProcessSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents: Option<DependentSnapshot>,
}
