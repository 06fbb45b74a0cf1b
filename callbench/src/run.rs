use std::path::{Path, PathBuf};

use anyhow::Context as _;
use callbench_core::report::{MonitoringReport, persist_json, persist_monitoring};
use serde::Serialize;

use crate::run_error::RunError;

mod load;
mod monitor;
mod queries;

pub(crate) use load::load;
pub(crate) use monitor::monitor;
pub(crate) use queries::queries;

/// Writes a report to `--report-out`, if given.
fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<(), RunError> {
    let Some(path) = path else {
        return Ok(());
    };

    persist_json(path, report)
        .with_context(|| format!("failed to write report: {}", path.display()))
        .map_err(RunError::RuntimeError)?;

    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

/// Persists the monitoring artifact. A failed write is logged and never fails the run.
fn write_monitoring_artifact(dir: &Path, report: &MonitoringReport) -> Option<PathBuf> {
    match persist_monitoring(dir, report) {
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

fn invalid_input(err: anyhow::Error) -> RunError {
    RunError::InvalidInput(err)
}
