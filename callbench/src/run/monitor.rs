use std::time::Duration;

use anyhow::Context as _;
use callbench_core::monitor::{DependentSource, ResourceSampler};
use callbench_core::report::ReportThresholds;

use super::write_monitoring_artifact;
use crate::cli::MonitorArgs;
use crate::config::resolve_thresholds;
use crate::exit_codes::ExitCode;
use crate::output::{self, OutputFormatter};
use crate::run_error::RunError;

pub(crate) async fn monitor(args: MonitorArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);
    let thresholds = resolve_thresholds(&ReportThresholds::default(), &args.thresholds);

    match args.database.as_deref() {
        None => {
            let sampler = ResourceSampler::new().with_progress(out.progress());
            sample_until_stopped(sampler, &args, out.as_ref(), &thresholds).await
        }
        #[cfg(feature = "sqlite")]
        Some(url) => {
            use callbench_core::monitor::StoreCounts;
            use callbench_core::query::SqliteStore;

            let store = SqliteStore::connect(url)
                .await
                .with_context(|| format!("failed to open database: {url}"))
                .map_err(RunError::InvalidInput)?;
            let sampler = ResourceSampler::with_dependents(StoreCounts::call_center(store))
                .with_progress(out.progress());
            sample_until_stopped(sampler, &args, out.as_ref(), &thresholds).await
        }
        #[cfg(not(feature = "sqlite"))]
        Some(_) => Err(RunError::InvalidInput(anyhow::anyhow!(
            "`--database` needs a build with the `sqlite` feature"
        ))),
    }
}

async fn sample_until_stopped<D: DependentSource>(
    sampler: ResourceSampler<D>,
    args: &MonitorArgs,
    out: &dyn OutputFormatter,
    thresholds: &ReportThresholds,
) -> Result<ExitCode, RunError> {
    sampler.start(Duration::from_millis(args.interval_ms))?;

    let reason = wait_for_stop(args.duration)
        .await
        .map_err(RunError::RuntimeError)?;
    tracing::info!(reason, "stopping monitoring");

    sampler.stop().await;
    let report = sampler.generate_report(thresholds);
    let artifact = write_monitoring_artifact(&args.results_dir, &report);
    out.print_monitoring(&report, artifact.as_deref())
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

/// Resolves on SIGINT, SIGTERM or after `limit`, whichever comes first.
async fn wait_for_stop(limit: Option<Duration>) -> anyhow::Result<&'static str> {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;
    #[cfg(unix)]
    let terminate = sigterm.recv();
    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            Ok("interrupted")
        }
        _ = terminate => Ok("terminated"),
        () = deadline => Ok("duration elapsed"),
    }
}
