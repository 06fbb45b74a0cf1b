use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and summary.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "callbench",
    author,
    version,
    about = "Load, query and resource benchmarking for a call-center API",
    long_about = "callbench measures a call-center backend from three angles.\n\n`load` drives authenticated virtual users through increasing concurrency tiers, `queries` times a catalog of data-store probes, and `monitor` samples host and process resources until interrupted.\n\nLogs go to stderr and honour RUST_LOG (default `info`).",
    after_help = "Examples:\n  callbench load --base-url http://localhost:3000 --username ops --password secret\n  callbench load --config load.yaml --tiers 1,10,50 --duration 1m --output json\n  callbench queries --database sqlite://bench.db --seed 10000 --iterations 20\n  callbench monitor 500 --results-dir ./results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run tiered load against the HTTP API
    #[command(
        long_about = "Authenticate once, then run each concurrency tier for a fixed duration.\n\nCLI flags override values from the YAML config, which overrides built-in defaults."
    )]
    Load(LoadArgs),

    /// Time data-store query probes
    Queries(QueriesArgs),

    /// Sample host/process resources until interrupted (SIGINT/SIGTERM)
    Monitor(MonitorArgs),
}

/// Report limit overrides shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct ThresholdArgs {
    /// Minimum success rate (%) for a tier to count as stable
    #[arg(long)]
    pub min_success_rate: Option<f64>,

    /// Maximum average latency (ms) for a tier to count as stable
    #[arg(long)]
    pub max_avg_latency_ms: Option<f64>,

    /// Average probe latency (ms) above which a query is reported as slow
    #[arg(long)]
    pub slow_query_ms: Option<f64>,

    #[arg(long)]
    pub max_cpu_percent: Option<f64>,

    #[arg(long)]
    pub max_memory_percent: Option<f64>,

    /// Resident memory (MB) above which the process is reported as heavy
    #[arg(long)]
    pub max_heap_mb: Option<f64>,

    /// Number of slowest probes listed in the query report
    #[arg(long)]
    pub top_slowest: Option<usize>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// API base URL (e.g. http://localhost:3000)
    #[arg(long, env = "CALLBENCH_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "CALLBENCH_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "CALLBENCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Concurrency tiers, comma separated (default 1,5,10,20,50)
    #[arg(long, value_delimiter = ',')]
    pub tiers: Option<Vec<u64>>,

    /// Duration of each tier (e.g. 30s, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Pause after every request of a virtual user (0 allowed)
    #[arg(long, value_parser = parse_duration)]
    pub delay: Option<Duration>,

    /// Pause between tiers
    #[arg(long, value_parser = parse_duration)]
    pub settle: Option<Duration>,

    /// Per-request timeout
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// YAML config with load settings, scenarios and thresholds
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also sample resources every N milliseconds while the load runs
    #[arg(long, value_name = "MS")]
    pub monitor_interval: Option<u64>,

    /// Where the monitoring artifact goes when --monitor-interval is set
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Write the load report as JSON to this file
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct QueriesArgs {
    /// Database URL
    #[arg(long, env = "CALLBENCH_DATABASE", default_value = "sqlite::memory:")]
    pub database: String,

    /// Create the demo schema and insert N call records before probing
    /// (in-memory databases are seeded with 1000 by default)
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Iterations per probe (the insert probe always runs once)
    #[arg(long)]
    pub iterations: Option<u32>,

    /// YAML config with probes and thresholds
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the query report as JSON to this file
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Sampling interval in milliseconds
    #[arg(default_value_t = 1000)]
    pub interval_ms: u64,

    /// Directory the monitoring artifact is written to (created if missing)
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Database whose record counts are sampled alongside host metrics
    #[arg(long, env = "CALLBENCH_DATABASE")]
    pub database: Option<String>,

    /// Stop on its own after this long instead of waiting for a signal
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
