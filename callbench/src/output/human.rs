use std::path::Path;
use std::sync::Arc;

mod format;
mod progress;

use format::{format_bytes, format_duration, format_rate};
use progress::TierProgress;

use callbench_core::query::QueryMeasurement;
use callbench_core::report::{LoadReport, MonitoringReport, QueryReport};
use callbench_core::{ProgressEvent, ProgressFn};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<TierProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(TierProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |event| match event {
            ProgressEvent::TierStarted {
                tier,
                tiers,
                concurrency,
                duration,
            } => {
                progress.begin(format!("tier {tier}/{tiers} vus={concurrency}"), duration);
            }
            ProgressEvent::TierTick {
                elapsed,
                requests_total,
                failed_total,
                ..
            } => {
                let rps = requests_total as f64 / elapsed.as_secs_f64().max(1e-9);
                progress.update(
                    elapsed,
                    format!(
                        "elapsed={} requests={requests_total} rps={} failed={failed_total}",
                        format_duration(elapsed),
                        format_rate(rps)
                    ),
                );
            }
            ProgressEvent::TierFinished {
                tier,
                tiers,
                result,
            } => {
                progress.finish();
                println!(
                    "tier {tier}/{tiers}: vus={} requests={} success={:.1}% avg={:.2}ms rps={}",
                    result.concurrency,
                    result.total_requests,
                    result.success_rate(),
                    result.avg_latency_ms,
                    format_rate(result.requests_per_sec)
                );
            }
            ProgressEvent::Settling { pause } => {
                println!("settling for {}", format_duration(pause));
            }
            ProgressEvent::ProbeFinished {
                probe,
                probes,
                measurement,
            } => {
                println!("{}", query_line(probe, probes, &measurement));
            }
            ProgressEvent::Sample(sample) => {
                let rss = sample
                    .process
                    .as_ref()
                    .map(|p| format_bytes(p.rss_bytes))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "sample: cpu={:.1}% mem={:.1}% rss={rss} load1={:.2}",
                    sample.host.cpu_usage_percent,
                    sample.host.mem_used_percent,
                    sample.host.load_average_1m
                );
            }
        }))
    }

    fn print_load(&self, report: &LoadReport) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", report.render_text());
        Ok(())
    }

    fn print_queries(&self, report: &QueryReport) -> anyhow::Result<()> {
        print!("{}", report.render_text());
        Ok(())
    }

    fn print_monitoring(
        &self,
        report: &MonitoringReport,
        artifact: Option<&Path>,
    ) -> anyhow::Result<()> {
        print!("{}", report.render_text());
        if let Some(path) = artifact {
            println!("artifact: {}", path.display());
        }
        Ok(())
    }
}

fn query_line(index: usize, total: usize, m: &QueryMeasurement) -> String {
    let stats = format!(
        "avg={:.2}ms min={:.2}ms max={:.2}ms",
        m.avg_latency_ms, m.min_latency_ms, m.max_latency_ms
    );
    if m.success {
        format!("probe {index}/{total}: {} {stats}", m.name)
    } else {
        format!(
            "probe {index}/{total}: {} {stats} FAILED {}",
            m.name,
            m.error.as_deref().unwrap_or("unknown error")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_query_line_keeps_zeroed_stats() {
        let m = QueryMeasurement {
            name: "calls_by_agent".to_string(),
            success: false,
            avg_latency_ms: 0.0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            error: Some("no such table: calls".to_string()),
            iterations: 0,
            index_used: None,
        };
        assert_eq!(
            query_line(2, 7, &m),
            "probe 2/7: calls_by_agent avg=0.00ms min=0.00ms max=0.00ms FAILED no such table: calls"
        );
    }
}
