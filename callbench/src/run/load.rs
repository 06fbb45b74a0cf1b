use std::time::Duration;

use anyhow::anyhow;
use callbench_core::load::{Credentials, LoadConfig, LoadOrchestrator, ScenarioCatalog};
use callbench_core::monitor::ResourceSampler;
use callbench_core::report::LoadReport;

use super::{invalid_input, write_monitoring_artifact, write_report};
use crate::cli::LoadArgs;
use crate::config::{ConfigFile, YamlDuration, resolve_thresholds};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub(crate) async fn load(args: LoadArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file = ConfigFile::load_opt(args.config.as_deref())
        .await
        .map_err(invalid_input)?;
    let thresholds = resolve_thresholds(&file.thresholds, &args.thresholds);
    let config = load_config(&args, &file)?;
    config.validate()?;

    let catalog = if file.scenarios.is_empty() {
        ScenarioCatalog::call_center()
    } else {
        ScenarioCatalog::new(file.scenarios.clone())?
    };

    let sampler = match args.monitor_interval {
        Some(0) => return Err(callbench_core::Error::InvalidInterval.into()),
        Some(ms) => {
            let sampler = ResourceSampler::new();
            sampler.start(Duration::from_millis(ms))?;
            Some(sampler)
        }
        None => None,
    };

    tracing::info!(
        base_url = %config.base_url,
        tiers = ?config.tiers,
        duration = ?config.tier_duration,
        scenarios = catalog.len(),
        "starting load run"
    );

    let orchestrator = LoadOrchestrator::new(config, catalog).with_progress(out.progress());
    let run = orchestrator.run_all().await;

    // The sampler is stopped and persisted even when the run itself failed.
    if let Some(sampler) = sampler {
        sampler.stop().await;
        let report = sampler.generate_report(&thresholds);
        write_monitoring_artifact(&args.results_dir, &report);
    }

    let run = run?;
    tracing::info!(elapsed = ?run.elapsed, tiers = run.tiers.len(), "load run finished");

    let report = LoadReport::new(&run.tiers, &thresholds);
    write_report(args.report_out.as_deref(), &report)?;
    out.print_load(&report).map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

/// Merges CLI flags over the config file over built-in defaults.
fn load_config(args: &LoadArgs, file: &ConfigFile) -> Result<LoadConfig, RunError> {
    let base_url = args
        .base_url
        .clone()
        .or_else(|| file.base_url.clone())
        .ok_or_else(|| invalid_input(anyhow!("missing base url (--base-url or `baseUrl`)")))?;
    let username = args
        .username
        .clone()
        .or_else(|| file.username.clone())
        .ok_or_else(|| invalid_input(anyhow!("missing username (--username or `username`)")))?;
    let password = args
        .password
        .clone()
        .or_else(|| file.password.clone())
        .ok_or_else(|| invalid_input(anyhow!("missing password (--password or `password`)")))?;

    let mut cfg = LoadConfig::new(base_url, Credentials { username, password });

    if let Some(login_path) = &file.login_path {
        cfg.login_path = login_path.clone();
    }
    if let Some(token_field) = &file.token_field {
        cfg.token_field = token_field.clone();
    }
    if let Some(tiers) = args.tiers.clone().or_else(|| file.tiers.clone()) {
        cfg.tiers = tiers;
    }

    let pick = |cli: Option<Duration>, yaml: Option<YamlDuration>| {
        cli.or_else(|| yaml.map(YamlDuration::into_inner))
    };
    if let Some(d) = pick(args.duration, file.duration) {
        cfg.tier_duration = d;
    }
    if let Some(d) = pick(args.delay, file.delay) {
        cfg.request_delay = d;
    }
    if let Some(d) = pick(args.settle, file.settle) {
        cfg.settle_pause = d;
    }
    if let Some(d) = pick(args.timeout, file.timeout) {
        cfg.request_timeout = (!d.is_zero()).then_some(d);
    }

    Ok(cfg)
}
