use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::dependents::{DependentSource, NoDependents};
use super::probe::HostProbe;
use super::sample::{DependentSnapshot, ResourceSample};
use super::session::{MonitoringSession, SessionState};
use crate::clock::unix_millis;
use crate::error::{Error, Result};
use crate::progress::{ProgressEvent, ProgressFn};
use crate::report::{MonitoringReport, ReportThresholds, persist_monitoring};

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic host/process sampler driving one [`MonitoringSession`].
pub struct ResourceSampler<D: DependentSource = NoDependents> {
    session: Arc<Mutex<MonitoringSession>>,
    dependents: Option<Arc<D>>,
    progress: Option<ProgressFn>,
    worker: Mutex<Option<Worker>>,
}

impl ResourceSampler<NoDependents> {
    pub fn new() -> Self {
        Self::build(None)
    }
}

impl Default for ResourceSampler<NoDependents> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DependentSource> ResourceSampler<D> {
    /// Sampler that also records `source` on every tick.
    pub fn with_dependents(source: D) -> Self {
        Self::build(Some(Arc::new(source)))
    }

    fn build(dependents: Option<Arc<D>>) -> Self {
        Self {
            session: Arc::new(Mutex::new(MonitoringSession::new())),
            dependents,
            progress: None,
            worker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Starts ticking every `interval`. Returns `Ok(false)` if the session already left idle.
    pub fn start(&self, interval: Duration) -> Result<bool> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }

        {
            let mut session = lock(&self.session);
            if !session.start(unix_millis()) {
                tracing::warn!(state = %session.state(), "monitoring already started, ignoring start");
                return Ok(false);
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(sample_loop(
            self.session.clone(),
            self.dependents.clone(),
            self.progress.clone(),
            interval,
            stop_rx,
        ));
        *lock(&self.worker) = Some(Worker { stop_tx, handle });

        tracing::info!(interval_ms = interval.as_millis() as u64, "monitoring started");
        Ok(true)
    }

    /// Stops ticking and waits for an in-flight tick. Stopping twice is a no-op.
    pub async fn stop(&self) {
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            let _ = worker.stop_tx.send(true);
            if let Err(err) = worker.handle.await {
                tracing::warn!(%err, "sampler task ended abnormally");
            }
        }
        lock(&self.session).stop(unix_millis());
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    pub fn samples(&self) -> Vec<ResourceSample> {
        lock(&self.session).samples().to_vec()
    }

    pub fn session(&self) -> MonitoringSession {
        lock(&self.session).clone()
    }

    /// Valid in any state, including before the first sample.
    pub fn generate_report(&self, thresholds: &ReportThresholds) -> MonitoringReport {
        let session = lock(&self.session);
        MonitoringReport::new(&session, unix_millis(), thresholds)
    }

    /// Writes the monitoring artifact under `dir`. Failures are logged and yield `None`.
    pub fn persist(&self, dir: &Path, thresholds: &ReportThresholds) -> Option<PathBuf> {
        let report = self.generate_report(thresholds);
        match persist_monitoring(dir, &report) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "monitoring artifact written");
                Some(path)
            }
            Err(err) => {
                tracing::error!(%err, dir = %dir.display(), "failed to persist monitoring artifact");
                None
            }
        }
    }
}

impl<D: DependentSource> Drop for ResourceSampler<D> {
    fn drop(&mut self) {
        if let Some(worker) = lock(&self.worker).take() {
            let _ = worker.stop_tx.send(true);
            worker.handle.abort();
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn sample_loop<D: DependentSource>(
    session: Arc<Mutex<MonitoringSession>>,
    dependents: Option<Arc<D>>,
    progress: Option<ProgressFn>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    // The CPU baseline needs one full interval before the first reading means anything.
    let mut probe = HostProbe::new();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let sample = take_sample(&mut probe, dependents.as_deref()).await;
        let stored = lock(&session).push(sample).cloned();
        match (stored, &progress) {
            (Some(sample), Some(progress)) => (progress)(ProgressEvent::Sample(sample)),
            (Some(_), None) => {}
            (None, _) => break,
        }
    }
}

async fn take_sample<D: DependentSource>(
    probe: &mut HostProbe,
    dependents: Option<&D>,
) -> ResourceSample {
    let timestamp = unix_millis();
    let host = probe.host();
    let process = probe
        .process()
        .inspect_err(|err| tracing::warn!(%err, "process snapshot unavailable"))
        .ok();

    let dependents = match dependents {
        Some(source) => Some(match source.snapshot().await {
            Ok(counts) => DependentSnapshot::Counts { counts },
            Err(err) => {
                tracing::warn!(%err, "dependent snapshot failed");
                DependentSnapshot::Unavailable {
                    error: err.to_string(),
                }
            }
        }),
        None => None,
    };

    ResourceSample {
        timestamp,
        host,
        process,
        dependents,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::BTreeMap;

    use super::*;
    use crate::monitor::SamplingError;

    struct BrokenStore;

    impl DependentSource for BrokenStore {
        async fn snapshot(&self) -> std::result::Result<BTreeMap<String, u64>, SamplingError> {
            Err(SamplingError::Dependents("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let sampler = ResourceSampler::new();
        assert!(matches!(
            sampler.start(Duration::ZERO),
            Err(Error::InvalidInterval)
        ));
        assert_eq!(sampler.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn double_start_is_ignored_and_stop_is_terminal() {
        let sampler = ResourceSampler::new();
        assert!(sampler.start(Duration::from_millis(20)).unwrap());
        assert!(!sampler.start(Duration::from_millis(20)).unwrap());

        tokio::time::sleep(Duration::from_millis(110)).await;
        sampler.stop().await;
        let n = sampler.samples().len();
        assert!(n >= 2, "expected a few samples, got {n}");
        assert_eq!(sampler.state(), SessionState::Stopped);

        assert!(!sampler.start(Duration::from_millis(20)).unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sampler.samples().len(), n);
        sampler.stop().await;
    }

    #[tokio::test]
    async fn first_sample_waits_a_full_interval() {
        let sampler = ResourceSampler::new();
        sampler.start(Duration::from_millis(40)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sampler.samples().is_empty());

        tokio::time::sleep(Duration::from_millis(60)).await;
        sampler.stop().await;

        let started = sampler.session().started_at_ms().unwrap();
        let samples = sampler.samples();
        assert!(!samples.is_empty());
        assert!(
            samples[0].timestamp >= started + 40,
            "first sample at {} for a session started at {started}",
            samples[0].timestamp
        );
    }

    #[tokio::test]
    async fn stop_before_first_tick_records_nothing() {
        let sampler = ResourceSampler::new();
        sampler.start(Duration::from_millis(10)).unwrap();
        sampler.stop().await;
        assert!(sampler.samples().is_empty());
        assert_eq!(sampler.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn failing_dependents_become_markers() {
        let sampler = ResourceSampler::with_dependents(BrokenStore);
        sampler.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sampler.stop().await;

        let samples = sampler.samples();
        assert!(!samples.is_empty());
        for s in &samples {
            assert!(matches!(
                &s.dependents,
                Some(DependentSnapshot::Unavailable { error }) if error.contains("connection refused")
            ));
        }
    }

    #[tokio::test]
    async fn stop_before_start_yields_empty_stopped_session() {
        let sampler = ResourceSampler::new();
        sampler.stop().await;
        assert_eq!(sampler.state(), SessionState::Stopped);
        assert!(sampler.samples().is_empty());
    }
}
