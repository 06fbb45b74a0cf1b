use std::time::Instant;

use serde::Serialize;

use super::probe::{ProbeOp, QueryProbe};
use super::store::{RecordStore, StoreError};
use crate::clock::millis_f64;
use crate::error::{Error, Result};
use crate::progress::{ProgressEvent, ProgressFn};

/// Outcome of one probe. Failed probes carry zeroed latency stats, never partial ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeasurement {
    pub name: String,
    pub success: bool,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Iterations that completed successfully.
    pub iterations: u32,
    pub index_used: Option<bool>,
}

impl QueryMeasurement {
    fn failed(name: &str, completed: u32, err: &StoreError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            avg_latency_ms: 0.0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            error: Some(err.to_string()),
            iterations: completed,
            index_used: None,
        }
    }

    fn from_latencies(name: &str, latencies: &[f64]) -> Self {
        let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
        let max = latencies.iter().copied().fold(0.0, f64::max);
        let (min, avg) = if latencies.is_empty() {
            (0.0, 0.0)
        } else {
            let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
            (min, avg.clamp(min, max))
        };

        Self {
            name: name.to_string(),
            success: true,
            avg_latency_ms: avg,
            min_latency_ms: min,
            max_latency_ms: max,
            error: None,
            iterations: u32::try_from(latencies.len()).unwrap_or(u32::MAX),
            index_used: None,
        }
    }
}

/// Runs probes one after another against a single store.
pub struct QueryBenchmark<'a, S> {
    store: &'a S,
    progress: Option<ProgressFn>,
}

impl<'a, S: RecordStore> QueryBenchmark<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every probe in order. A failing probe never stops the ones after it.
    pub async fn run(&self, probes: &[QueryProbe]) -> Result<Vec<QueryMeasurement>> {
        if let Some(p) = probes.iter().find(|p| p.iterations == 0) {
            return Err(Error::InvalidIterations(p.name.clone()));
        }

        let mut out = Vec::with_capacity(probes.len());
        for (idx, probe) in probes.iter().enumerate() {
            let measurement = self.measure(probe).await;
            if let Some(err) = &measurement.error {
                tracing::warn!(probe = %probe.name, %err, "probe failed");
            }
            if let Some(progress) = &self.progress {
                (progress)(ProgressEvent::ProbeFinished {
                    probe: idx + 1,
                    probes: probes.len(),
                    measurement: measurement.clone(),
                });
            }
            out.push(measurement);
        }
        Ok(out)
    }

    pub async fn measure(&self, probe: &QueryProbe) -> QueryMeasurement {
        let mut latencies = Vec::with_capacity(probe.iterations as usize);
        for completed in 0..probe.iterations {
            let started = Instant::now();
            if let Err(err) = self.execute(&probe.op).await {
                return QueryMeasurement::failed(&probe.name, completed, &err);
            }
            latencies.push(millis_f64(started.elapsed()));
        }

        let mut measurement = QueryMeasurement::from_latencies(&probe.name, &latencies);
        if let Some((collection, filter)) = probe.op.explain_target() {
            measurement.index_used = match self.store.explain(collection, filter).await {
                Ok(plan) => plan,
                Err(err) => {
                    tracing::debug!(probe = %probe.name, %err, "access plan unavailable");
                    None
                }
            };
        }
        measurement
    }

    async fn execute(&self, op: &ProbeOp) -> std::result::Result<(), StoreError> {
        match op {
            ProbeOp::Count(q) => self.store.count(q).await.map(drop),
            ProbeOp::Find(q) => self.store.find(q).await.map(drop),
            ProbeOp::GroupCount(q) => self.store.group_count(q).await.map(drop),
            ProbeOp::Insert(q) => self.store.insert(q).await,
        }
    }
}
