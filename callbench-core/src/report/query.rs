use std::fmt::Write as _;

use serde::Serialize;

use super::ReportThresholds;
use super::load::render_recommendations;
use crate::query::QueryMeasurement;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub measurements: Vec<QueryMeasurement>,
    /// Successful probes, slowest first, at most `top_slowest`.
    pub slowest: Vec<QueryMeasurement>,
    /// Mean of the successful probes' averages; `None` when none succeeded.
    pub overall_avg_latency_ms: Option<f64>,
    pub failed: Vec<String>,
    pub full_scans: Vec<String>,
    pub recommendations: Vec<String>,
}

impl QueryReport {
    pub fn new(measurements: &[QueryMeasurement], thresholds: &ReportThresholds) -> Self {
        let mut ok: Vec<&QueryMeasurement> = measurements.iter().filter(|m| m.success).collect();
        ok.sort_by(|a, b| {
            b.avg_latency_ms
                .total_cmp(&a.avg_latency_ms)
                .then_with(|| a.name.cmp(&b.name))
        });

        let overall_avg_latency_ms = (!ok.is_empty())
            .then(|| ok.iter().map(|m| m.avg_latency_ms).sum::<f64>() / ok.len() as f64);

        let failed: Vec<String> = measurements
            .iter()
            .filter(|m| !m.success)
            .map(|m| m.name.clone())
            .collect();
        let full_scans: Vec<String> = measurements
            .iter()
            .filter(|m| m.success && m.index_used == Some(false))
            .map(|m| m.name.clone())
            .collect();

        let mut recommendations = Vec::new();
        for m in measurements.iter().filter(|m| !m.success) {
            recommendations.push(format!(
                "{} failed: {}",
                m.name,
                m.error.as_deref().unwrap_or("unknown error")
            ));
        }
        for m in ok
            .iter()
            .filter(|m| m.avg_latency_ms > thresholds.slow_query_ms)
        {
            recommendations.push(format!(
                "{} averages {:.1}ms (limit {:.1}ms), review its filter and sort fields",
                m.name, m.avg_latency_ms, thresholds.slow_query_ms
            ));
        }
        for name in &full_scans {
            recommendations.push(format!(
                "{name} scans the whole collection, add an index on its filter fields"
            ));
        }
        if recommendations.is_empty() && !measurements.is_empty() {
            recommendations.push("all probes succeeded within the latency limit".to_string());
        }

        Self {
            measurements: measurements.to_vec(),
            slowest: ok
                .into_iter()
                .take(thresholds.top_slowest)
                .cloned()
                .collect(),
            overall_avg_latency_ms,
            failed,
            full_scans,
            recommendations,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.measurements.is_empty() {
            out.push_str("queries: no probes\n");
            return out;
        }

        out.push_str("query summary\n");
        for m in &self.measurements {
            if m.success {
                let index = match m.index_used {
                    Some(true) => " index=yes",
                    Some(false) => " index=no",
                    None => "",
                };
                writeln!(
                    out,
                    "  {}: avg={:.2}ms min={:.2}ms max={:.2}ms (n={}){index}",
                    m.name, m.avg_latency_ms, m.min_latency_ms, m.max_latency_ms, m.iterations
                )
                .ok();
            } else {
                writeln!(
                    out,
                    "  {}: avg={:.2}ms min={:.2}ms max={:.2}ms FAILED {}",
                    m.name,
                    m.avg_latency_ms,
                    m.min_latency_ms,
                    m.max_latency_ms,
                    m.error.as_deref().unwrap_or("unknown error")
                )
                .ok();
            }
        }

        if !self.slowest.is_empty() {
            out.push_str("\nslowest\n");
            for (i, m) in self.slowest.iter().enumerate() {
                writeln!(out, "  {}. {} {:.2}ms", i + 1, m.name, m.avg_latency_ms).ok();
            }
        }

        out.push_str("\ntotals\n");
        writeln!(
            out,
            "  probes: {} (failed {})",
            self.measurements.len(),
            self.failed.len()
        )
        .ok();
        match self.overall_avg_latency_ms {
            Some(avg) => writeln!(out, "  avg latency: {avg:.2}ms").ok(),
            None => writeln!(out, "  avg latency: n/a").ok(),
        };

        render_recommendations(&self.recommendations, &mut out);
        out
    }
}
