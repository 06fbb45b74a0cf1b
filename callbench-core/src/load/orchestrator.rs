use std::sync::Arc;
use std::time::{Duration, Instant};

use callbench_http::HttpClient;
use tokio::sync::Barrier;
use tokio::time::MissedTickBehavior;

use super::auth::{AuthSession, authenticate};
use super::config::LoadConfig;
use super::gate::TierGate;
use super::outcome::OutcomeLog;
use super::result::RunResult;
use super::scenario::ScenarioCatalog;
use super::vu::{StartSignal, VuContext, run_virtual_user};
use crate::clock::unix_millis;
use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressFn};

/// Results of a whole load run, one entry per tier in configured order.
#[derive(Debug, Clone)]
pub struct LoadRun {
    pub tiers: Vec<RunResult>,
    pub started_at_ms: u64,
    pub elapsed: Duration,
}

pub struct LoadOrchestrator {
    config: LoadConfig,
    catalog: ScenarioCatalog,
    client: Arc<HttpClient>,
    progress: Option<ProgressFn>,
}

impl LoadOrchestrator {
    pub fn new(config: LoadConfig, catalog: ScenarioCatalog) -> Self {
        Self {
            config,
            catalog,
            client: Arc::new(HttpClient::default()),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = Arc::new(client);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Authenticates once, then runs every tier in order with a barrier between tiers.
    ///
    /// Authentication failure aborts the run before any tier starts; everything after that is
    /// recorded as data.
    pub async fn run_all(&self) -> Result<LoadRun> {
        self.config.validate()?;

        let started = Instant::now();
        let started_at_ms = unix_millis();

        tracing::info!(url = %self.config.login_url(), "authenticating");
        let session = authenticate(
            &self.client,
            &self.config.login_url(),
            &self.config.credentials,
            &self.config.token_field,
            self.config.request_timeout,
        )
        .await
        .inspect_err(|err| tracing::error!(%err, "authentication failed, no tier will run"))?;
        let session = Arc::new(session);

        let tiers = self.config.tiers.len();
        let mut results = Vec::with_capacity(tiers);
        for (idx, &concurrency) in self.config.tiers.iter().enumerate() {
            if idx > 0 && !self.config.settle_pause.is_zero() {
                self.emit(ProgressEvent::Settling {
                    pause: self.config.settle_pause,
                });
                tokio::time::sleep(self.config.settle_pause).await;
            }

            let tier = idx + 1;
            let result = self
                .run_tier(tier, tiers, concurrency, session.clone())
                .await?;

            tracing::debug!(
                tier,
                concurrency,
                total = result.total_requests,
                failed = result.fail_count,
                "tier finished"
            );
            self.emit(ProgressEvent::TierFinished {
                tier,
                tiers,
                result: result.clone(),
            });
            results.push(result);
        }

        Ok(LoadRun {
            tiers: results,
            started_at_ms,
            elapsed: started.elapsed(),
        })
    }

    /// Runs a single tier: spawns `concurrency` virtual users, waits for all of them.
    pub async fn run_tier(
        &self,
        tier: usize,
        tiers: usize,
        concurrency: u64,
        session: Arc<AuthSession>,
    ) -> Result<RunResult> {
        let duration = self.config.tier_duration;
        self.emit(ProgressEvent::TierStarted {
            tier,
            tiers,
            concurrency,
            duration,
        });

        let vus = usize::try_from(concurrency).unwrap_or(usize::MAX);
        let log = Arc::new(OutcomeLog::default());
        let gate = Arc::new(TierGate::new(duration));
        let ready_barrier = Arc::new(Barrier::new(vus.saturating_add(1)));
        let start_signal = Arc::new(StartSignal::new());
        let base_url: Arc<str> = Arc::from(self.config.base_url.as_str());

        let mut handles = Vec::with_capacity(vus);
        for vu_id in 1..=concurrency {
            let ctx = VuContext {
                vu_id,
                base_url: base_url.clone(),
                client: self.client.clone(),
                session: session.clone(),
                catalog: self.catalog.clone(),
                request_delay: self.config.request_delay,
                request_timeout: self.config.request_timeout,
                gate: gate.clone(),
                log: log.clone(),
                ready_barrier: ready_barrier.clone(),
                start_signal: start_signal.clone(),
            };
            handles.push(tokio::spawn(run_virtual_user(ctx)));
        }

        // Keep task spawning out of the measured window.
        ready_barrier.wait().await;
        let started = Instant::now();
        gate.start_at(started);
        start_signal.start();

        let ticker = self.progress.as_ref().map(|progress| {
            let progress = progress.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately.
                interval.tick().await;

                loop {
                    interval.tick().await;
                    (progress)(ProgressEvent::TierTick {
                        tier,
                        concurrency,
                        elapsed: started.elapsed(),
                        duration,
                        requests_total: log.total(),
                        failed_total: log.failed_total(),
                    });
                }
            })
        });

        let mut issued = 0u64;
        let mut joined = Ok(());
        for h in handles {
            match h.await {
                Ok(n) => issued += n,
                Err(err) => joined = Err(err),
            }
        }

        if let Some(h) = ticker {
            h.abort();
            let _ = h.await;
        }
        joined?;

        let elapsed = started.elapsed();
        let outcomes = log.take();
        let admitted = gate.admitted();
        debug_assert_eq!(admitted, issued, "every admitted iteration issues one request");
        tracing::debug!(
            tier,
            admitted,
            recorded = outcomes.len(),
            "tier gate closed"
        );
        Ok(RunResult::from_outcomes(concurrency, elapsed, &outcomes))
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            (progress)(event);
        }
    }
}
