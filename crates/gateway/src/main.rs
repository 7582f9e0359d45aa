//! Carimbo gateway binary

use std::sync::Arc;
use std::time::Duration;

use carimbo_fetch::ReleaseClient;
use carimbo_gateway::app::{AppState, router};
use carimbo_gateway::cli::{Cli, init_tracing};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.level.into(), cli.json)?;

    let fetcher = ReleaseClient::new(
        &cli.upstream_base_url,
        Duration::from_secs(cli.upstream_timeout_secs),
    )?;
    let state = Arc::new(AppState::new(fetcher)?);

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| miette::miette!("failed to bind {addr}: {e}"))?;
    info!(%addr, upstream = %cli.upstream_base_url, "gateway listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| miette::miette!("server error: {e}"))
}
