use crate::cli::OutputFormat;
use std::path::Path;

use callbench_core::ProgressFn;
use callbench_core::report::{LoadReport, MonitoringReport, QueryReport};

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn progress(&self) -> Option<ProgressFn>;
    fn print_load(&self, report: &LoadReport) -> anyhow::Result<()>;
    fn print_queries(&self, report: &QueryReport) -> anyhow::Result<()>;
    fn print_monitoring(
        &self,
        report: &MonitoringReport,
        artifact: Option<&Path>,
    ) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
