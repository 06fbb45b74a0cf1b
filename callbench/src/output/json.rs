use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use callbench_core::load::RunResult;
use callbench_core::monitor::ResourceSample;
use callbench_core::query::QueryMeasurement;
use callbench_core::report::{LoadReport, MonitoringReport, QueryReport};
use callbench_core::{ProgressEvent, ProgressFn};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |event| {
            if let Some(line) = build_progress_line(&event) {
                emit_json_line(&line);
            }
        }))
    }

    fn print_load(&self, report: &LoadReport) -> anyhow::Result<()> {
        emit_json_line(&SummaryLine {
            kind: "load_summary",
            report,
        });
        Ok(())
    }

    fn print_queries(&self, report: &QueryReport) -> anyhow::Result<()> {
        emit_json_line(&SummaryLine {
            kind: "query_summary",
            report,
        });
        Ok(())
    }

    fn print_monitoring(
        &self,
        report: &MonitoringReport,
        artifact: Option<&Path>,
    ) -> anyhow::Result<()> {
        emit_json_line(&MonitoringLine {
            kind: "monitoring_summary",
            artifact: artifact.map(|p| p.display().to_string()),
            report,
        });
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub(crate) enum JsonProgressLine<'a> {
    Tick {
        kind: &'static str,
        tier: usize,
        concurrency: u64,
        elapsed_secs: f64,
        duration_secs: f64,
        requests_total: u64,
        failed_total: u64,
    },
    Tier {
        kind: &'static str,
        tier: usize,
        tiers: usize,
        #[serde(flatten)]
        result: &'a RunResult,
    },
    Probe {
        kind: &'static str,
        probe: usize,
        probes: usize,
        #[serde(flatten)]
        measurement: &'a QueryMeasurement,
    },
    Sample {
        kind: &'static str,
        #[serde(flatten)]
        sample: &'a ResourceSample,
    },
}

fn build_progress_line(event: &ProgressEvent) -> Option<JsonProgressLine<'_>> {
    match event {
        ProgressEvent::TierTick {
            tier,
            concurrency,
            elapsed,
            duration,
            requests_total,
            failed_total,
        } => Some(JsonProgressLine::Tick {
            kind: "progress",
            tier: *tier,
            concurrency: *concurrency,
            elapsed_secs: elapsed.as_secs_f64(),
            duration_secs: duration.as_secs_f64(),
            requests_total: *requests_total,
            failed_total: *failed_total,
        }),
        ProgressEvent::TierFinished {
            tier,
            tiers,
            result,
        } => Some(JsonProgressLine::Tier {
            kind: "tier",
            tier: *tier,
            tiers: *tiers,
            result,
        }),
        ProgressEvent::ProbeFinished {
            probe,
            probes,
            measurement,
        } => Some(JsonProgressLine::Probe {
            kind: "probe",
            probe: *probe,
            probes: *probes,
            measurement,
        }),
        ProgressEvent::Sample(sample) => Some(JsonProgressLine::Sample {
            kind: "sample",
            sample,
        }),
        ProgressEvent::TierStarted { .. } | ProgressEvent::Settling { .. } => None,
    }
}

#[derive(Debug, Serialize)]
struct SummaryLine<'a, T: Serialize> {
    kind: &'static str,
    #[serde(flatten)]
    report: &'a T,
}

#[derive(Debug, Serialize)]
struct MonitoringLine<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<String>,
    #[serde(flatten)]
    report: &'a MonitoringReport,
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbench_core::load::RequestOutcome;
    use serde_json::Value;
    use std::time::Duration;

    fn to_value<T: Serialize>(v: &T) -> Value {
        match serde_json::to_value(v) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        }
    }

    #[test]
    fn tick_line_has_kind() {
        let event = ProgressEvent::TierTick {
            tier: 2,
            concurrency: 5,
            elapsed: Duration::from_secs(3),
            duration: Duration::from_secs(10),
            requests_total: 120,
            failed_total: 1,
        };
        let line = build_progress_line(&event).unwrap_or_else(|| panic!("expected a line"));
        let v = to_value(&line);
        assert_eq!(v["kind"], "progress");
        assert_eq!(v["tier"], 2);
        assert_eq!(v["requestsTotal"], 120);
        assert_eq!(v["elapsedSecs"], 3.0);
    }

    #[test]
    fn tier_line_flattens_result() {
        let outcomes = vec![
            RequestOutcome::from_status("calls", 200, 10.0, 1),
            RequestOutcome::from_status("calls", 500, 30.0, 2),
        ];
        let event = ProgressEvent::TierFinished {
            tier: 1,
            tiers: 1,
            result: RunResult::from_outcomes(2, Duration::from_secs(1), &outcomes),
        };
        let line = build_progress_line(&event).unwrap_or_else(|| panic!("expected a line"));
        let v = to_value(&line);
        assert_eq!(v["kind"], "tier");
        assert_eq!(v["concurrency"], 2);
        assert_eq!(v["totalRequests"], 2);
    }

    #[test]
    fn start_and_settle_are_not_emitted() {
        let started = ProgressEvent::TierStarted {
            tier: 1,
            tiers: 1,
            concurrency: 1,
            duration: Duration::from_secs(1),
        };
        assert!(build_progress_line(&started).is_none());
        assert!(
            build_progress_line(&ProgressEvent::Settling {
                pause: Duration::from_secs(1)
            })
            .is_none()
        );
    }

    #[test]
    fn summary_line_flattens_report() {
        let report = LoadReport::new(&[], &Default::default());
        let v = to_value(&SummaryLine {
            kind: "load_summary",
            report: &report,
        });
        assert_eq!(v["kind"], "load_summary");
        assert_eq!(v["totalRequests"], 0);
        assert!(v["tiers"].as_array().is_some_and(Vec::is_empty));
    }
}
