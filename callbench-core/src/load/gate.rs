use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Wall-clock gate shared by the virtual users of one tier.
#[derive(Debug)]
pub struct TierGate {
    duration: Duration,
    deadline: OnceLock<Instant>,
    admitted: AtomicU64,
}

impl TierGate {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: OnceLock::new(),
            admitted: AtomicU64::new(0),
        }
    }

    pub fn start_at(&self, started: Instant) {
        let _ = self.deadline.set(started + self.duration);
    }

    /// Admits one more iteration while the tier's duration has not elapsed.
    pub fn next(&self) -> bool {
        let now = Instant::now();

        // If the orchestrator didn't set a start time, lazily start from the first iteration.
        if self.deadline.get().is_none() {
            self.start_at(now);
        }

        if let Some(deadline) = self.deadline.get()
            && now >= *deadline
        {
            return false;
        }

        self.admitted.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }
}
