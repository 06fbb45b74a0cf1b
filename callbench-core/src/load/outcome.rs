use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of one executed request. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub scenario: String,
    pub success: bool,
    /// `None` when the request never produced a response (transport failure).
    pub status: Option<u16>,
    pub latency_ms: f64,
    pub error: Option<String>,
    pub timestamp_ms: u64,
}

impl RequestOutcome {
    pub fn from_status(scenario: &str, status: u16, latency_ms: f64, timestamp_ms: u64) -> Self {
        let success = (200..300).contains(&status);
        Self {
            scenario: scenario.to_string(),
            success,
            status: Some(status),
            latency_ms: latency_ms.max(0.0),
            error: (!success).then(|| format!("HTTP {status}")),
            timestamp_ms,
        }
    }

    pub fn from_error(
        scenario: &str,
        error: impl std::fmt::Display,
        latency_ms: f64,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            success: false,
            status: None,
            latency_ms: latency_ms.max(0.0),
            error: Some(error.to_string()),
            timestamp_ms,
        }
    }
}

/// Append-only outcome log shared by the virtual users of one tier.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    outcomes: Mutex<Vec<RequestOutcome>>,
    total: AtomicU64,
    failed: AtomicU64,
}

impl OutcomeLog {
    pub fn push(&self, outcome: RequestOutcome) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if !outcome.success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(outcome);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Drains the log. Only meaningful once every writer has finished.
    pub fn take(&self) -> Vec<RequestOutcome> {
        std::mem::take(
            &mut *self
                .outcomes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}
