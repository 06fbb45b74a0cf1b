#![cfg_attr(not(feature = "sqlite"), allow(dead_code))]

use callbench_core::query::{QueryProbe, call_center_probes};

use crate::cli::QueriesArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

/// Seed rows for an in-memory database when `--seed` is not given.
const IN_MEMORY_SEED_ROWS: u32 = 1000;
const SEED: u64 = 0x00ca_11ce;

#[cfg(feature = "sqlite")]
pub(crate) async fn queries(args: QueriesArgs) -> Result<ExitCode, RunError> {
    use anyhow::Context as _;
    use callbench_core::query::{QueryBenchmark, SqliteStore};
    use callbench_core::report::QueryReport;

    use super::{invalid_input, write_report};
    use crate::config::{ConfigFile, resolve_thresholds};
    use crate::output;

    let out = output::formatter(args.output);

    let file = ConfigFile::load_opt(args.config.as_deref())
        .await
        .map_err(invalid_input)?;
    let thresholds = resolve_thresholds(&file.thresholds, &args.thresholds);
    let probes = probes(file.probes, args.iterations);

    let store = SqliteStore::connect(&args.database)
        .await
        .with_context(|| format!("failed to open database: {}", args.database))
        .map_err(invalid_input)?;

    if let Some(rows) = seed_rows(&args.database, args.seed) {
        tracing::info!(rows, "seeding demo data");
        store
            .seed_demo(rows, SEED)
            .await
            .context("failed to seed demo data")
            .map_err(RunError::RuntimeError)?;
    }

    tracing::info!(database = %args.database, probes = probes.len(), "running query probes");
    let measurements = QueryBenchmark::new(&store)
        .with_progress(out.progress())
        .run(&probes)
        .await?;

    let report = QueryReport::new(&measurements, &thresholds);
    write_report(args.report_out.as_deref(), &report)?;
    out.print_queries(&report).map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

#[cfg(not(feature = "sqlite"))]
pub(crate) async fn queries(_args: QueriesArgs) -> Result<ExitCode, RunError> {
    Err(RunError::InvalidInput(anyhow::anyhow!(
        "`queries` needs a build with the `sqlite` feature"
    )))
}

/// Probes from the config file, or the built-in catalog. `--iterations` applies to the
/// reads of both; inserts keep their own count so reruns do not grow the store.
fn probes(from_file: Vec<QueryProbe>, iterations: Option<u32>) -> Vec<QueryProbe> {
    if from_file.is_empty() {
        return call_center_probes(iterations.unwrap_or(QueryProbe::DEFAULT_ITERATIONS));
    }

    match iterations {
        Some(n) => from_file
            .into_iter()
            .map(|p| if p.op.is_write() { p } else { p.iterations(n) })
            .collect(),
        None => from_file,
    }
}

fn seed_rows(database: &str, seed: Option<u32>) -> Option<u32> {
    seed.or_else(|| database.contains(":memory:").then_some(IN_MEMORY_SEED_ROWS))
}
