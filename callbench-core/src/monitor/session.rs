use serde::Serialize;

use super::sample::ResourceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

/// Ordered samples of one monitoring run. `Stopped` is terminal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSession {
    state: SessionState,
    started_at_ms: Option<u64>,
    stopped_at_ms: Option<u64>,
    samples: Vec<ResourceSample>,
}

impl MonitoringSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            started_at_ms: None,
            stopped_at_ms: None,
            samples: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn samples(&self) -> &[ResourceSample] {
        &self.samples
    }

    /// Idle -> running. Returns `false` (and changes nothing) from any other state.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Running;
        self.started_at_ms = Some(now_ms);
        true
    }

    /// Moves to stopped from any state; repeated calls keep the first stop time.
    pub fn stop(&mut self, now_ms: u64) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        self.stopped_at_ms = Some(now_ms);
    }

    /// Appends a sample while running, bumping its timestamp past the previous one if needed.
    ///
    /// Returns the stored sample, or `None` when the session is not running.
    pub fn push(&mut self, mut sample: ResourceSample) -> Option<&ResourceSample> {
        if self.state != SessionState::Running {
            return None;
        }
        if let Some(last) = self.samples.last() {
            sample.timestamp = sample.timestamp.max(last.timestamp + 1);
        }
        self.samples.push(sample);
        self.samples.last()
    }

    /// Milliseconds between start and stop (or `now_ms` while running); 0 if never started.
    pub fn duration_ms(&self, now_ms: u64) -> u64 {
        match self.started_at_ms {
            Some(start) => self.stopped_at_ms.unwrap_or(now_ms).saturating_sub(start),
            None => 0,
        }
    }
}

impl Default for MonitoringSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::monitor::{HostSnapshot, ProcessSnapshot};

    pub(crate) fn sample(timestamp: u64, cpu: f64, mem: f64, rss_mb: u64) -> ResourceSample {
        ResourceSample {
            timestamp,
            host: HostSnapshot {
                cpu_usage_percent: cpu,
                cpu_core_count: 4,
                mem_total_bytes: 1000,
                mem_used_bytes: (mem * 10.0) as u64,
                mem_used_percent: mem,
                load_average_1m: 0.5,
            },
            process: Some(ProcessSnapshot {
                rss_bytes: rss_mb * 1024 * 1024,
                virtual_bytes: rss_mb * 4 * 1024 * 1024,
                cpu_usage_percent: 1.0,
            }),
            dependents: None,
        }
    }

    #[test]
    fn lifecycle_is_idle_running_stopped() {
        let mut s = MonitoringSession::new();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.push(sample(1, 0.0, 0.0, 1)).is_none());

        assert!(s.start(100));
        assert!(!s.start(200));
        assert_eq!(s.started_at_ms(), Some(100));

        s.stop(400);
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(!s.start(500));
        s.stop(900);
        assert_eq!(s.duration_ms(10_000), 300);
    }

    #[test]
    fn stop_from_idle_is_terminal() {
        let mut s = MonitoringSession::new();
        s.stop(5);
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(!s.start(6));
        assert_eq!(s.duration_ms(10), 0);
    }

    #[test]
    fn timestamps_are_forced_strictly_increasing() {
        let mut s = MonitoringSession::new();
        s.start(0);
        s.push(sample(1000, 0.0, 0.0, 1));
        s.push(sample(1000, 0.0, 0.0, 1));
        s.push(sample(990, 0.0, 0.0, 1));
        s.push(sample(2000, 0.0, 0.0, 1));

        let ts: Vec<u64> = s.samples().iter().map(|x| x.timestamp).collect();
        assert_eq!(ts, vec![1000, 1001, 1002, 2000]);
    }

    #[test]
    fn state_displays_lowercase() {
        assert_eq!(SessionState::Running.to_string(), "running");
        assert_eq!(
            serde_json::to_value(SessionState::Stopped).unwrap(),
            serde_json::json!("stopped")
        );
    }
}
