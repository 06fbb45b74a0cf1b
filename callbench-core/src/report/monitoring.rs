use std::fmt::Write as _;

use serde::Serialize;

use super::ReportThresholds;
use super::load::render_recommendations;
use crate::monitor::{MonitoringSession, ResourceSample, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

impl Aggregate {
    /// `None` for an empty series, so no NaN ever reaches a report.
    pub fn over(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            n += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (n > 0).then(|| Self {
            average: (sum / n as f64).clamp(min, max),
            max,
            min,
        })
    }
}

/// CPU and memory in percent, heap (resident set) in MB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitoringSummary {
    pub cpu: Option<Aggregate>,
    pub memory: Option<Aggregate>,
    pub heap: Option<Aggregate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringFlags {
    pub high_cpu: bool,
    pub high_memory: bool,
    pub high_heap: bool,
    pub high_load: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
    /// Unix milliseconds the report was generated at.
    pub timestamp: u64,
    pub state: SessionState,
    /// Session length in milliseconds.
    pub duration: u64,
    pub metrics_count: usize,
    pub summary: MonitoringSummary,
    pub average_load_1m: Option<f64>,
    pub cpu_core_count: Option<usize>,
    pub flags: MonitoringFlags,
    pub recommendations: Vec<String>,
    pub raw_metrics: Vec<ResourceSample>,
}

/// The persisted JSON shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringArtifact<'a> {
    pub timestamp: u64,
    pub duration: u64,
    pub metrics_count: usize,
    pub summary: &'a MonitoringSummary,
    pub raw_metrics: &'a [ResourceSample],
}

impl MonitoringReport {
    pub fn new(session: &MonitoringSession, now_ms: u64, thresholds: &ReportThresholds) -> Self {
        let samples = session.samples();
        let summary = MonitoringSummary {
            cpu: Aggregate::over(samples.iter().map(|s| s.host.cpu_usage_percent)),
            memory: Aggregate::over(samples.iter().map(|s| s.host.mem_used_percent)),
            heap: Aggregate::over(
                samples
                    .iter()
                    .filter_map(|s| s.process.as_ref().map(|p| p.rss_mb())),
            ),
        };
        let average_load_1m =
            Aggregate::over(samples.iter().map(|s| s.host.load_average_1m)).map(|a| a.average);
        let cpu_core_count = samples.last().map(|s| s.host.cpu_core_count);

        let above = |agg: Option<Aggregate>, limit: f64| agg.is_some_and(|a| a.average > limit);
        let flags = MonitoringFlags {
            high_cpu: above(summary.cpu, thresholds.max_cpu_percent),
            high_memory: above(summary.memory, thresholds.max_memory_percent),
            high_heap: above(summary.heap, thresholds.max_heap_mb),
            high_load: match (average_load_1m, cpu_core_count) {
                (Some(load), Some(cores)) => load > cores as f64,
                _ => false,
            },
        };

        let mut report = Self {
            timestamp: now_ms,
            state: session.state(),
            duration: session.duration_ms(now_ms),
            metrics_count: samples.len(),
            summary,
            average_load_1m,
            cpu_core_count,
            flags,
            recommendations: Vec::new(),
            raw_metrics: samples.to_vec(),
        };
        report.recommendations = report.recommend(thresholds);
        report
    }

    pub fn artifact(&self) -> MonitoringArtifact<'_> {
        MonitoringArtifact {
            timestamp: self.timestamp,
            duration: self.duration,
            metrics_count: self.metrics_count,
            summary: &self.summary,
            raw_metrics: &self.raw_metrics,
        }
    }

    fn recommend(&self, thresholds: &ReportThresholds) -> Vec<String> {
        if self.metrics_count == 0 {
            return vec!["no samples were collected, run the monitor for at least one interval".to_string()];
        }

        let mut out = Vec::new();
        if let Some(cpu) = self.summary.cpu.filter(|_| self.flags.high_cpu) {
            out.push(format!(
                "average CPU usage {:.1}% exceeds {:.1}%, scale out or profile the hot paths",
                cpu.average, thresholds.max_cpu_percent
            ));
        }
        if let Some(mem) = self.summary.memory.filter(|_| self.flags.high_memory) {
            out.push(format!(
                "average memory usage {:.1}% exceeds {:.1}%, add memory or reduce cache sizes",
                mem.average, thresholds.max_memory_percent
            ));
        }
        if let Some(heap) = self.summary.heap.filter(|_| self.flags.high_heap) {
            out.push(format!(
                "average resident memory {:.1}MB exceeds {:.1}MB, look for leaks or unbounded buffers",
                heap.average, thresholds.max_heap_mb
            ));
        }
        if let (true, Some(load), Some(cores)) =
            (self.flags.high_load, self.average_load_1m, self.cpu_core_count)
        {
            out.push(format!(
                "load average {load:.2} exceeds the {cores} available cores, the host is oversubscribed"
            ));
        }
        if out.is_empty() {
            out.push("resource usage stayed within limits".to_string());
        }
        out
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("monitoring summary\n");
        writeln!(
            out,
            "  state: {} samples: {} duration: {:.1}s",
            self.state,
            self.metrics_count,
            self.duration as f64 / 1000.0
        )
        .ok();
        render_aggregate(&mut out, "cpu", self.summary.cpu, "%");
        render_aggregate(&mut out, "memory", self.summary.memory, "%");
        render_aggregate(&mut out, "heap", self.summary.heap, "MB");
        if let Some(load) = self.average_load_1m {
            writeln!(out, "  load 1m: avg={load:.2}").ok();
        }

        render_recommendations(&self.recommendations, &mut out);
        out
    }
}

fn render_aggregate(out: &mut String, label: &str, agg: Option<Aggregate>, unit: &str) {
    match agg {
        Some(a) => writeln!(
            out,
            "  {label}: avg={:.1}{unit} max={:.1}{unit} min={:.1}{unit}",
            a.average, a.max, a.min
        )
        .ok(),
        None => writeln!(out, "  {label}: no data").ok(),
    };
}
