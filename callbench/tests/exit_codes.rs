use std::process::{Command, Output};

use anyhow::Context as _;
use callbench_testserver::{FailureMode, TestServer, TestServerConfig};

fn status_code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

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

fn expect_code(out: &Output, code: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out) == code,
        "expected exit code {code}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = callbench()
        .args(["load", "--duration", "10x"])
        .output()
        .context("run callbench binary")?;
    expect_code(&out, 30)
}

#[test]
fn missing_credentials_exit_30() -> anyhow::Result<()> {
    let out = callbench()
        .args(["load", "--base-url", "http://127.0.0.1:9"])
        .output()
        .context("run callbench binary")?;
    expect_code(&out, 30)
}

#[test]
fn zero_tier_exits_30() -> anyhow::Result<()> {
    let out = callbench()
        .args([
            "load",
            "--base-url",
            "http://127.0.0.1:9",
            "--username",
            "u",
            "--password",
            "p",
            "--tiers",
            "1,0",
        ])
        .output()
        .context("run callbench binary")?;
    expect_code(&out, 30)
}

#[test]
fn zero_monitor_interval_exits_30() -> anyhow::Result<()> {
    let out = callbench()
        .args(["monitor", "0", "--duration", "1s"])
        .output()
        .context("run callbench binary")?;
    expect_code(&out, 30)
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let out = callbench()
        .arg("--help")
        .output()
        .context("run callbench binary")?;
    expect_code(&out, 0)
}

#[tokio::test]
async fn rejected_login_exits_20() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerConfig {
        failure: FailureMode::RejectLogin,
        ..Default::default()
    })
    .await
    .context("start test server")?;
    let base_url = server.base_url().to_string();

    let out = tokio::task::spawn_blocking(move || {
        callbench()
            .args([
                "load",
                "--base-url",
                &base_url,
                "--username",
                "operator",
                "--password",
                "wrong",
                "--tiers",
                "1",
                "--duration",
                "1s",
            ])
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run callbench binary")?;

    let requests = server.stats().requests_total();
    server.shutdown().await;

    expect_code(&out, 20)?;
    anyhow::ensure!(requests == 0, "no tier should run, got {requests} requests");
    Ok(())
}
