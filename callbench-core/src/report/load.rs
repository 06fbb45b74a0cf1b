use std::fmt::Write as _;

use serde::Serialize;

use super::ReportThresholds;
use crate::load::RunResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub tiers: Vec<RunResult>,
    pub total_requests: u64,
    pub total_failed: u64,
    /// Mean of the per-tier rates, each tier weighted equally.
    pub average_rps: f64,
    /// All requests over all tier time.
    pub pooled_rps: f64,
    /// Highest concurrency whose tier met both the success-rate and latency limits.
    pub highest_stable_concurrency: Option<u64>,
    pub recommendations: Vec<String>,
}

impl LoadReport {
    pub fn new(tiers: &[RunResult], thresholds: &ReportThresholds) -> Self {
        let total_requests = tiers.iter().map(|t| t.total_requests).sum();
        let total_failed = tiers.iter().map(|t| t.fail_count).sum();
        let average_rps = if tiers.is_empty() {
            0.0
        } else {
            tiers.iter().map(|t| t.requests_per_sec).sum::<f64>() / tiers.len() as f64
        };
        let total_secs: f64 = tiers.iter().map(|t| t.duration_sec).sum();
        let pooled_rps = if total_secs > 0.0 {
            total_requests as f64 / total_secs
        } else {
            0.0
        };

        let stable = |t: &RunResult| {
            t.total_requests > 0
                && t.success_rate() >= thresholds.min_success_rate
                && t.avg_latency_ms <= thresholds.max_avg_latency_ms
        };
        let highest_stable_concurrency = tiers
            .iter()
            .filter(|t| stable(t))
            .map(|t| t.concurrency)
            .max();

        Self {
            tiers: tiers.to_vec(),
            total_requests,
            total_failed,
            average_rps,
            pooled_rps,
            highest_stable_concurrency,
            recommendations: recommendations(tiers, thresholds),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.tiers.is_empty() {
            out.push_str("load: no tiers\n");
            return out;
        }

        out.push_str("load summary\n");
        for t in &self.tiers {
            writeln!(out, "tier: concurrency={}", t.concurrency).ok();
            writeln!(
                out,
                "  requests: {} (failed {}) success={:.1}%",
                t.total_requests,
                t.fail_count,
                t.success_rate()
            )
            .ok();
            writeln!(
                out,
                "  latency: avg={:.1}ms min={:.1}ms max={:.1}ms",
                t.avg_latency_ms, t.min_latency_ms, t.max_latency_ms
            )
            .ok();
            writeln!(
                out,
                "  rate: rps={:.1} duration={:.1}s",
                t.requests_per_sec, t.duration_sec
            )
            .ok();
            for e in &t.distinct_errors {
                writeln!(out, "    {}: {}", e.error, e.count).ok();
            }
        }

        out.push_str("\ntotals\n");
        writeln!(
            out,
            "  requests: {} (failed {})",
            self.total_requests, self.total_failed
        )
        .ok();
        writeln!(
            out,
            "  rates: avg_rps={:.1} pooled_rps={:.1}",
            self.average_rps, self.pooled_rps
        )
        .ok();
        match self.highest_stable_concurrency {
            Some(c) => writeln!(out, "  highest stable concurrency: {c}").ok(),
            None => writeln!(out, "  highest stable concurrency: none").ok(),
        };

        render_recommendations(&self.recommendations, &mut out);
        out
    }
}

pub(super) fn render_recommendations(recommendations: &[String], out: &mut String) {
    if recommendations.is_empty() {
        return;
    }
    out.push_str("\nrecommendations\n");
    for r in recommendations {
        writeln!(out, "  - {r}").ok();
    }
}

fn recommendations(tiers: &[RunResult], thresholds: &ReportThresholds) -> Vec<String> {
    let mut out = Vec::new();
    if tiers.is_empty() {
        return out;
    }

    for t in tiers {
        if t.total_requests == 0 {
            out.push(format!(
                "concurrency {}: no requests completed, check the delay and tier duration",
                t.concurrency
            ));
            continue;
        }
        if t.success_rate() < thresholds.min_success_rate {
            out.push(format!(
                "concurrency {}: success rate {:.1}% is below {:.1}%, inspect the errors listed for this tier",
                t.concurrency,
                t.success_rate(),
                thresholds.min_success_rate
            ));
        }
        if t.avg_latency_ms > thresholds.max_avg_latency_ms {
            out.push(format!(
                "concurrency {}: average latency {:.1}ms exceeds {:.1}ms",
                t.concurrency, t.avg_latency_ms, thresholds.max_avg_latency_ms
            ));
        }
    }

    // Throughput that drops while concurrency grows marks saturation.
    for pair in tiers.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.concurrency > prev.concurrency
            && next.total_requests > 0
            && next.requests_per_sec < prev.requests_per_sec
        {
            out.push(format!(
                "throughput fell from {:.1} to {:.1} rps between concurrency {} and {}, the API saturates around {}",
                prev.requests_per_sec,
                next.requests_per_sec,
                prev.concurrency,
                next.concurrency,
                prev.concurrency
            ));
            break;
        }
    }

    if out.is_empty() {
        out.push("all tiers met the success-rate and latency limits".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn tier(concurrency: u64, total: u64, ok: u64, avg: f64, rps: f64) -> RunResult {
        RunResult {
            concurrency,
            duration_sec: 10.0,
            total_requests: total,
            success_count: ok,
            fail_count: total - ok,
            avg_latency_ms: avg,
            min_latency_ms: avg / 2.0,
            max_latency_ms: avg * 2.0,
            requests_per_sec: rps,
            distinct_errors: vec![],
        }
    }

    #[test]
    fn average_rps_is_mean_of_tiers_and_pooled_is_reported() {
        let tiers = [tier(1, 100, 100, 10.0, 10.0), tier(5, 300, 300, 12.0, 30.0)];
        let r = LoadReport::new(&tiers, &ReportThresholds::default());
        assert_eq!(r.average_rps, 20.0);
        assert_eq!(r.pooled_rps, 20.0);
        assert_eq!(r.total_requests, 400);
        assert_eq!(r.highest_stable_concurrency, Some(5));
        assert_eq!(r.recommendations.len(), 1);
    }

    #[test]
    fn unstable_tiers_are_flagged() {
        let tiers = [
            tier(1, 100, 100, 10.0, 50.0),
            tier(10, 100, 50, 2000.0, 40.0),
        ];
        let r = LoadReport::new(&tiers, &ReportThresholds::default());
        assert_eq!(r.highest_stable_concurrency, Some(1));
        let text = r.recommendations.join("\n");
        assert!(text.contains("success rate 50.0%"));
        assert!(text.contains("average latency 2000.0ms"));
        assert!(text.contains("saturates around 1"));
    }

    #[test]
    fn empty_input_is_well_defined_and_idempotent() {
        let th = ReportThresholds::default();
        let a = LoadReport::new(&[], &th);
        let b = LoadReport::new(&[], &th);
        assert_eq!(a, b);
        assert_eq!(a.average_rps, 0.0);
        assert_eq!(a.highest_stable_concurrency, None);
        assert_eq!(a.render_text(), "load: no tiers\n");
    }

    #[test]
    fn text_lists_every_tier() {
        let tiers = [tier(1, 10, 10, 5.0, 1.0), tier(5, 50, 49, 6.0, 5.0)];
        let text = LoadReport::new(&tiers, &ReportThresholds::default()).render_text();
        assert!(text.contains("tier: concurrency=1"));
        assert!(text.contains("tier: concurrency=5"));
        assert!(text.contains("requests: 50 (failed 1) success=98.0%"));
        assert!(text.contains("highest stable concurrency: 5"));
    }
}
