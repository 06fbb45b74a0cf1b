use std::net::SocketAddr;
use std::time::Duration;

use callbench_testserver::{FailureMode, TestServerConfig};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut config = TestServerConfig::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--latency-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--latency-ms requires a number"))?;
                config.latency = Duration::from_millis(ms.parse()?);
            }
            "--fail-status" => {
                let code = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--fail-status requires an HTTP status"))?;
                config.failure = FailureMode::Status(code.parse()?);
            }
            "-h" | "--help" => {
                eprintln!(
                    "callbench-testserver\n\nUSAGE:\n  callbench-testserver [--bind 127.0.0.1:0] [--latency-ms 10] [--fail-status 500]\n\nCREDENTIALS:\n  username={} password={}\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready.",
                    callbench_testserver::TEST_USERNAME,
                    callbench_testserver::TEST_PASSWORD
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let stats = callbench_testserver::TestServerStats::default();
    let app = callbench_testserver::router(stats, config);

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
