use serde::{Deserialize, Serialize};

/// Limits that turn measurements into recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ReportThresholds {
    pub min_success_rate: f64,
    pub max_avg_latency_ms: f64,
    /// Successful probes slower than this on average are called out.
    pub slow_query_ms: f64,
    pub max_cpu_percent: f64,
    pub max_memory_percent: f64,
    pub max_heap_mb: f64,
    pub top_slowest: usize,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            min_success_rate: 95.0,
            max_avg_latency_ms: 1000.0,
            slow_query_ms: 100.0,
            max_cpu_percent: 80.0,
            max_memory_percent: 80.0,
            max_heap_mb: 500.0,
            top_slowest: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let t: ReportThresholds =
            serde_json::from_str(r#"{"maxCpuPercent": 60.0, "topSlowest": 3}"#).unwrap();
        assert_eq!(t.max_cpu_percent, 60.0);
        assert_eq!(t.top_slowest, 3);
        assert_eq!(t.min_success_rate, 95.0);
        assert_eq!(t.max_heap_mb, 500.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<ReportThresholds>(r#"{"max_cpu_percent": 1}"#).is_err());
    }
}
