mod auth;
mod config;
mod gate;
mod orchestrator;
mod outcome;
mod result;
mod scenario;
mod vu;

pub use auth::{AuthError, AuthSession, Credentials, authenticate};
pub use config::LoadConfig;
pub use gate::TierGate;
pub use orchestrator::{LoadOrchestrator, LoadRun};
pub use outcome::{OutcomeLog, RequestOutcome};
pub use result::{ErrorCount, RunResult};
pub use scenario::{Method, Scenario, ScenarioCatalog, ScenarioError};
pub use vu::{StartSignal, VuContext, run_virtual_user};
