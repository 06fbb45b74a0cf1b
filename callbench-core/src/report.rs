//! Pure summaries over measurements. Nothing here mutates its input.

mod load;
mod monitoring;
mod persist;
mod query;
mod thresholds;

pub use load::LoadReport;
pub use monitoring::{
    Aggregate, MonitoringArtifact, MonitoringFlags, MonitoringReport, MonitoringSummary,
};
pub use persist::{PersistError, persist_json, persist_monitoring};
pub use query::QueryReport;
pub use thresholds::ReportThresholds;
