use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde::ser::SerializeStruct as _;

use super::outcome::RequestOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCount {
    pub error: String,
    pub count: u64,
}

/// Aggregate of one concurrency tier.
///
/// The success rate is derived from the counts on demand and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub concurrency: u64,
    pub duration_sec: f64,
    pub total_requests: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub requests_per_sec: f64,
    /// Sorted by count (descending), then error text.
    pub distinct_errors: Vec<ErrorCount>,
}

impl RunResult {
    pub fn from_outcomes(concurrency: u64, elapsed: Duration, outcomes: &[RequestOutcome]) -> Self {
        let total_requests = outcomes.len() as u64;
        let success_count = outcomes.iter().filter(|o| o.success).count() as u64;
        let fail_count = total_requests - success_count;

        let (avg_latency_ms, min_latency_ms, max_latency_ms) = latency_stats(outcomes);

        let secs = elapsed.as_secs_f64();
        let requests_per_sec = if secs > 0.0 {
            total_requests as f64 / secs
        } else {
            0.0
        };

        let mut by_error: HashMap<&str, u64> = HashMap::new();
        for o in outcomes.iter().filter(|o| !o.success) {
            let key = o.error.as_deref().unwrap_or("unknown error");
            *by_error.entry(key).or_insert(0) += 1;
        }
        let mut distinct_errors: Vec<ErrorCount> = by_error
            .into_iter()
            .map(|(error, count)| ErrorCount {
                error: error.to_string(),
                count,
            })
            .collect();
        distinct_errors.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));

        Self {
            concurrency,
            duration_sec: secs,
            total_requests,
            success_count,
            fail_count,
            avg_latency_ms,
            min_latency_ms,
            max_latency_ms,
            requests_per_sec,
            distinct_errors,
        }
    }

    /// `success_count / total_requests * 100`, 0 for an empty tier.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.total_requests as f64) * 100.0
    }
}

fn latency_stats(outcomes: &[RequestOutcome]) -> (f64, f64, f64) {
    if outcomes.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut sum = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = 0.0f64;
    for o in outcomes {
        sum += o.latency_ms;
        min = min.min(o.latency_ms);
        max = max.max(o.latency_ms);
    }

    // Summation rounding can push the mean a hair outside [min, max].
    let avg = (sum / outcomes.len() as f64).clamp(min, max);
    (avg, min, max)
}

impl Serialize for RunResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("RunResult", 11)?;
        s.serialize_field("concurrency", &self.concurrency)?;
        s.serialize_field("durationSec", &self.duration_sec)?;
        s.serialize_field("totalRequests", &self.total_requests)?;
        s.serialize_field("successCount", &self.success_count)?;
        s.serialize_field("failCount", &self.fail_count)?;
        s.serialize_field("successRate", &self.success_rate())?;
        s.serialize_field("avgLatencyMs", &self.avg_latency_ms)?;
        s.serialize_field("minLatencyMs", &self.min_latency_ms)?;
        s.serialize_field("maxLatencyMs", &self.max_latency_ms)?;
        s.serialize_field("requestsPerSec", &self.requests_per_sec)?;
        s.serialize_field("distinctErrors", &self.distinct_errors)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn ok(latency_ms: f64) -> RequestOutcome {
        RequestOutcome::from_status("s", 200, latency_ms, 0)
    }

    fn failed(error: &str, latency_ms: f64) -> RequestOutcome {
        RequestOutcome::from_error("s", error, latency_ms, 0)
    }

    #[test]
    fn mixed_outcomes_aggregate_counts_and_latency() {
        let outcomes = vec![
            ok(10.0),
            ok(30.0),
            failed("connection refused", 5.0),
            RequestOutcome::from_status("s", 500, 15.0, 0),
        ];
        let r = RunResult::from_outcomes(4, Duration::from_secs(2), &outcomes);

        assert_eq!(r.total_requests, 4);
        assert_eq!(r.success_count, 2);
        assert_eq!(r.fail_count, 2);
        assert_eq!(r.success_rate(), 50.0);
        assert_eq!(r.min_latency_ms, 5.0);
        assert_eq!(r.max_latency_ms, 30.0);
        assert_eq!(r.avg_latency_ms, 15.0);
        assert_eq!(r.requests_per_sec, 2.0);
        assert_eq!(r.distinct_errors.len(), 2);
    }

    #[test]
    fn empty_tier_is_all_zero() {
        let r = RunResult::from_outcomes(5, Duration::from_secs(1), &[]);
        assert_eq!(r.total_requests, 0);
        assert_eq!(r.success_rate(), 0.0);
        assert_eq!(r.avg_latency_ms, 0.0);
        assert_eq!(r.min_latency_ms, 0.0);
        assert_eq!(r.max_latency_ms, 0.0);
        assert!(r.distinct_errors.is_empty());
        assert!(r.success_rate().is_finite());
    }

    #[test]
    fn zero_elapsed_does_not_divide_by_zero() {
        let r = RunResult::from_outcomes(1, Duration::ZERO, &[ok(1.0)]);
        assert_eq!(r.requests_per_sec, 0.0);
    }

    #[test]
    fn all_failures_list_every_error() {
        let outcomes = vec![
            failed("timeout", 100.0),
            failed("timeout", 100.0),
            RequestOutcome::from_status("s", 502, 1.0, 0),
        ];
        let r = RunResult::from_outcomes(2, Duration::from_secs(1), &outcomes);

        assert_eq!(r.success_count, 0);
        assert_eq!(r.success_rate(), 0.0);
        assert_eq!(
            r.distinct_errors,
            vec![
                ErrorCount {
                    error: "timeout".to_string(),
                    count: 2
                },
                ErrorCount {
                    error: "HTTP 502".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn min_avg_max_ordering_holds_for_identical_latencies() {
        let outcomes: Vec<_> = (0..3).map(|_| ok(0.1)).collect();
        let r = RunResult::from_outcomes(1, Duration::from_secs(1), &outcomes);
        assert!(r.min_latency_ms <= r.avg_latency_ms);
        assert!(r.avg_latency_ms <= r.max_latency_ms);
    }

    #[test]
    fn min_avg_max_ordering_holds_for_varied_inputs() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..200 {
            let n = rng.usize(1..50);
            let outcomes: Vec<_> = (0..n)
                .map(|_| {
                    let latency = rng.f64() * 2000.0;
                    if rng.bool() {
                        ok(latency)
                    } else {
                        failed("x", latency)
                    }
                })
                .collect();
            let r = RunResult::from_outcomes(1, Duration::from_millis(1500), &outcomes);

            assert!(r.min_latency_ms <= r.avg_latency_ms, "{r:?}");
            assert!(r.avg_latency_ms <= r.max_latency_ms, "{r:?}");
            let rate = r.success_rate();
            assert!((0.0..=100.0).contains(&rate));
            assert_eq!(
                rate,
                r.success_count as f64 / r.total_requests as f64 * 100.0
            );
        }
    }

    #[test]
    fn serialized_form_includes_derived_success_rate() {
        let r = RunResult::from_outcomes(1, Duration::from_secs(1), &[ok(1.0), failed("x", 1.0)]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["successRate"], serde_json::json!(50.0));
        assert_eq!(v["totalRequests"], serde_json::json!(2));
        assert_eq!(v["distinctErrors"][0]["error"], serde_json::json!("x"));
    }
}
