use std::process::ExitCode;

use anyhow::Context;
use staticd::config::Config;
use staticd::server;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = Config::load(std::env::args().skip(1)).context("invalid configuration")?;

    let server = server::start(&cfg).await?;
    let handle = server.handle();
    let mut serving = tokio::spawn(server.run());

    tokio::select! {
        res = &mut serving => return res?,
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
            handle.stop();
        }
        res = terminate() => {
            res.context("failed to listen for SIGTERM")?;
            tracing::info!("Terminate signal received");
            handle.stop();
        }
    }

    serving.await?
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}
