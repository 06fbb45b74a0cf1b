use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use callbench_http::HttpClient;
use tokio::sync::{Barrier, Notify};

use super::auth::AuthSession;
use super::gate::TierGate;
use super::outcome::{OutcomeLog, RequestOutcome};
use super::scenario::{Scenario, ScenarioCatalog};
use crate::clock::{millis_f64, unix_millis};

#[derive(Debug)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.started.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for StartSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one virtual user needs; all shared state is read-only except the log.
#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    pub base_url: Arc<str>,
    pub client: Arc<HttpClient>,
    pub session: Arc<AuthSession>,
    pub catalog: ScenarioCatalog,
    pub request_delay: Duration,
    pub request_timeout: Option<Duration>,
    pub gate: Arc<TierGate>,
    pub log: Arc<OutcomeLog>,
    pub ready_barrier: Arc<Barrier>,
    pub start_signal: Arc<StartSignal>,
}

/// Runs one simulated client until the tier gate closes. Returns the number of requests issued.
///
/// Requests are strictly sequential within a virtual user; every outcome, failed or not, lands
/// in the shared log.
pub async fn run_virtual_user(ctx: VuContext) -> u64 {
    ctx.ready_barrier.wait().await;
    ctx.start_signal.wait().await;

    let mut rng = fastrand::Rng::new();
    let mut issued = 0u64;

    while ctx.gate.next() {
        let scenario = ctx.catalog.pick(&mut rng);
        let outcome = execute(&ctx, scenario).await;
        ctx.log.push(outcome);
        issued += 1;

        tokio::time::sleep(ctx.request_delay).await;
    }

    tracing::debug!(vu_id = ctx.vu_id, issued, "virtual user finished");
    issued
}

async fn execute(ctx: &VuContext, scenario: &Scenario) -> RequestOutcome {
    let started = Instant::now();
    let timestamp_ms = unix_millis();

    let req = match scenario.build_request(&ctx.base_url) {
        Ok(req) => req
            .with_bearer(ctx.session.token())
            .with_timeout(ctx.request_timeout),
        Err(err) => {
            return RequestOutcome::from_error(
                &scenario.name,
                err,
                millis_f64(started.elapsed()),
                timestamp_ms,
            );
        }
    };

    match ctx.client.request(req).await {
        Ok(res) => RequestOutcome::from_status(
            &scenario.name,
            res.status,
            millis_f64(started.elapsed()),
            timestamp_ms,
        ),
        Err(err) => RequestOutcome::from_error(
            &scenario.name,
            err,
            millis_f64(started.elapsed()),
            timestamp_ms,
        ),
    }
}
