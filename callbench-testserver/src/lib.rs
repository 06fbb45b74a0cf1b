use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_LOGIN: &str = "/api/auth/login";
pub const PATH_LIST: &str = "/api/{resource}";
pub const PATH_CALL_BY_ID: &str = "/api/calls/{id}";
pub const PATH_CALLS_SEARCH: &str = "/api/calls/search";

pub const TEST_USERNAME: &str = "operator";
pub const TEST_PASSWORD: &str = "secret";
pub const TEST_TOKEN: &str = "callbench-test-token";

/// Resources served by the paginated list endpoint.
pub const RESOURCES: &[&str] = &["calls", "orders", "accounts", "tickets", "chats"];

const TOTAL_RECORDS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    None,
    /// Every authenticated API request answers with this status.
    Status(u16),
    /// The login endpoint rejects every attempt.
    RejectLogin,
    /// The login endpoint answers 200 without a token in the body.
    LoginWithoutToken,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestServerConfig {
    /// Artificial latency applied to every API request (login excluded).
    pub latency: Duration,
    pub failure: FailureMode,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    logins_total: Arc<AtomicU64>,
    unauthorized_total: Arc<AtomicU64>,
    searches_total: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_logins_total(&self) {
        self.logins_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_unauthorized_total(&self) {
        self.unauthorized_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_searches_total(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Authenticated API requests (login excluded).
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn logins_total(&self) -> u64 {
        self.logins_total.load(Ordering::Relaxed)
    }

    pub fn unauthorized_total(&self) -> u64 {
        self.unauthorized_total.load(Ordering::Relaxed)
    }

    pub fn searches_total(&self) -> u64 {
        self.searches_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
struct AppState {
    stats: TestServerStats,
    config: TestServerConfig,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    state.stats.inc_logins_total();

    match state.config.failure {
        FailureMode::RejectLogin => {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "login disabled"})))
                .into_response();
        }
        FailureMode::LoginWithoutToken => {
            return (StatusCode::OK, Json(json!({"user": TEST_USERNAME}))).into_response();
        }
        FailureMode::None | FailureMode::Status(_) => {}
    }

    match body {
        Ok(Json(req)) if req.username == TEST_USERNAME && req.password == TEST_PASSWORD => {
            (StatusCode::OK, Json(json!({"token": TEST_TOKEN}))).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid credentials"})),
        )
            .into_response(),
    }
}

/// Shared prologue of every authenticated endpoint: auth check, latency, failure injection.
async fn admit(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        == Some(TEST_TOKEN);
    if !authorized {
        state.stats.inc_unauthorized_total();
        return Err((StatusCode::UNAUTHORIZED, "missing or invalid token").into_response());
    }

    state.stats.inc_requests_total();

    if !state.config.latency.is_zero() {
        sleep(state.config.latency).await;
    }

    if let FailureMode::Status(code) = state.config.failure {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((status, "injected failure").into_response());
    }

    Ok(())
}

async fn handle_list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(res) = admit(&state, &headers).await {
        return res;
    }

    if !RESOURCES.contains(&resource.as_str()) {
        return (StatusCode::NOT_FOUND, "unknown resource").into_response();
    }

    let page = query
        .get("page")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(20)
        .clamp(1, 100);

    let first = (page - 1).saturating_mul(limit);
    let items: Vec<_> = (first..TOTAL_RECORDS.min(first.saturating_add(limit)))
        .map(|id| json!({"id": id + 1, "resource": resource}))
        .collect();

    Json(json!({
        "items": items,
        "page": page,
        "limit": limit,
        "total": TOTAL_RECORDS,
    }))
    .into_response()
}

async fn handle_call_by_id(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(res) = admit(&state, &headers).await {
        return res;
    }

    if id == 0 || id > TOTAL_RECORDS {
        return (StatusCode::NOT_FOUND, "call not found").into_response();
    }

    Json(json!({"id": id, "status": "answered"})).into_response()
}

async fn handle_calls_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    if let Err(res) = admit(&state, &headers).await {
        return res;
    }

    let Ok(Json(filter)) = body else {
        return (StatusCode::BAD_REQUEST, "bad json").into_response();
    };

    state.stats.inc_searches_total();
    Json(json!({"items": [], "filter": filter})).into_response()
}

pub fn router(stats: TestServerStats, config: TestServerConfig) -> Router {
    Router::new()
        .route(PATH_LOGIN, post(handle_login))
        .route(PATH_CALLS_SEARCH, post(handle_calls_search))
        .route(PATH_CALL_BY_ID, get(handle_call_by_id))
        .route(PATH_LIST, get(handle_list))
        .with_state(AppState { stats, config })
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::default()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();

        let app = router(stats.clone(), config);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
