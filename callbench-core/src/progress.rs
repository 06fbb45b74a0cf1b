use std::sync::Arc;
use std::time::Duration;

use crate::load::RunResult;
use crate::monitor::ResourceSample;
use crate::query::QueryMeasurement;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    TierStarted {
        /// 1-based tier index.
        tier: usize,
        tiers: usize,
        concurrency: u64,
        duration: Duration,
    },
    /// Emitted about once per second while a tier is running.
    TierTick {
        tier: usize,
        concurrency: u64,
        elapsed: Duration,
        duration: Duration,
        requests_total: u64,
        failed_total: u64,
    },
    TierFinished {
        tier: usize,
        tiers: usize,
        result: RunResult,
    },
    Settling {
        pause: Duration,
    },
    ProbeFinished {
        /// 1-based probe index.
        probe: usize,
        probes: usize,
        measurement: QueryMeasurement,
    },
    Sample(ResourceSample),
}

pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
