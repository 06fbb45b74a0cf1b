use std::path::{Path, PathBuf};

use serde::Serialize;

use super::MonitoringReport;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to create directory `{path}`: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes `value` as pretty JSON, creating missing parent directories.
pub fn persist_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `monitoring-<timestamp>.json` under `dir` and returns its path.
pub fn persist_monitoring(dir: &Path, report: &MonitoringReport) -> Result<PathBuf, PersistError> {
    let path = dir.join(format!("monitoring-{}.json", report.timestamp));
    persist_json(&path, &report.artifact())?;
    Ok(path)
}
