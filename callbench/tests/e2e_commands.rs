use std::process::{Command, Output};

use anyhow::Context as _;
use callbench_testserver::{TEST_PASSWORD, TEST_USERNAME, TestServer};
use serde_json::Value;

fn callbench() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_callbench"));
    for var in [
        "CALLBENCH_BASE_URL",
        "CALLBENCH_USERNAME",
        "CALLBENCH_PASSWORD",
        "CALLBENCH_DATABASE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn ndjson(out: &Output) -> anyhow::Result<Vec<Value>> {
    anyhow::ensure!(
        out.status.success(),
        "callbench failed with {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );

    String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("not json: {l}")))
        .collect()
}

fn of_kind<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines.iter().filter(|v| v["kind"] == kind).collect()
}

#[tokio::test]
async fn load_emits_tiers_and_summary() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();
    let dir = tempfile::tempdir().context("tempdir")?;
    let report_path = dir.path().join("reports/load.json");
    let results_dir = dir.path().join("results");

    let report_arg = report_path.clone();
    let results_arg = results_dir.clone();
    let out = tokio::task::spawn_blocking(move || {
        callbench()
            .args([
                "load",
                "--base-url",
                &base_url,
                "--username",
                TEST_USERNAME,
                "--password",
                TEST_PASSWORD,
                "--tiers",
                "1,2",
                "--duration",
                "1s",
                "--delay",
                "50ms",
                "--settle",
                "0",
                "--monitor-interval",
                "200",
                "--output",
                "json",
            ])
            .arg("--report-out")
            .arg(&report_arg)
            .arg("--results-dir")
            .arg(&results_arg)
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run callbench binary")?;

    let requests = server.stats().requests_total();
    let logins = server.stats().logins_total();
    server.shutdown().await;

    let lines = ndjson(&out)?;
    let tiers = of_kind(&lines, "tier");
    anyhow::ensure!(tiers.len() == 2, "expected 2 tier lines, got {}", tiers.len());
    anyhow::ensure!(tiers[0]["concurrency"] == 1 && tiers[1]["concurrency"] == 2);

    let summary = of_kind(&lines, "load_summary");
    anyhow::ensure!(summary.len() == 1, "expected one summary line");
    anyhow::ensure!(
        summary[0]["totalRequests"].as_u64() == Some(requests),
        "summary total {} != server total {requests}",
        summary[0]["totalRequests"]
    );
    anyhow::ensure!(summary[0]["totalFailed"] == 0);
    anyhow::ensure!(logins == 1, "expected a single login, got {logins}");

    let written: Value = serde_json::from_slice(
        &std::fs::read(&report_path).context("read report")?,
    )?;
    anyhow::ensure!(written["tiers"].as_array().map(Vec::len) == Some(2));

    let artifacts = std::fs::read_dir(&results_dir)
        .context("read results dir")?
        .count();
    anyhow::ensure!(artifacts == 1, "expected one monitoring artifact, got {artifacts}");

    Ok(())
}

#[test]
fn queries_probe_a_seeded_in_memory_store() -> anyhow::Result<()> {
    let out = callbench()
        .args([
            "queries",
            "--seed",
            "200",
            "--iterations",
            "2",
            "--output",
            "json",
        ])
        .output()
        .context("run callbench binary")?;

    let lines = ndjson(&out)?;
    let probes = of_kind(&lines, "probe");
    anyhow::ensure!(!probes.is_empty(), "expected probe lines");
    anyhow::ensure!(probes.iter().all(|p| p["success"] == true));

    let summary = of_kind(&lines, "query_summary");
    anyhow::ensure!(summary.len() == 1, "expected one summary line");
    anyhow::ensure!(summary[0]["failed"].as_array().is_some_and(Vec::is_empty));
    anyhow::ensure!(
        summary[0]["measurements"].as_array().map(Vec::len) == Some(probes.len())
    );

    Ok(())
}

#[test]
fn monitor_stops_after_duration_and_writes_artifact() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let results_dir = dir.path().join("nested/results");

    let out = callbench()
        .args(["monitor", "100", "--duration", "600ms", "--output", "json"])
        .arg("--results-dir")
        .arg(&results_dir)
        .output()
        .context("run callbench binary")?;

    let lines = ndjson(&out)?;
    let samples = of_kind(&lines, "sample");
    anyhow::ensure!(!samples.is_empty(), "expected sample lines");

    let summary = of_kind(&lines, "monitoring_summary");
    anyhow::ensure!(summary.len() == 1, "expected one summary line");
    anyhow::ensure!(summary[0]["state"] == "stopped");
    anyhow::ensure!(summary[0]["metricsCount"].as_u64() == Some(samples.len() as u64));

    let artifact = summary[0]["artifact"]
        .as_str()
        .context("summary names the artifact")?;
    let persisted: Value = serde_json::from_slice(&std::fs::read(artifact)?)?;
    for key in ["timestamp", "duration", "metricsCount", "summary", "rawMetrics"] {
        anyhow::ensure!(persisted.get(key).is_some(), "artifact lacks `{key}`");
    }

    Ok(())
}
