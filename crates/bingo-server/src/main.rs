//! Bingo server
//!
//! Runs the coordinator with configuration from `BINGO_*` environment
//! variables. Log verbosity follows `RUST_LOG`.

use bingo::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bingo=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_addr = %config.bind_addr,
        max_players = config.room.max_players,
        card_pool_size = config.room.card_pool_size,
        call_interval_ms = config.room.call_interval.as_millis() as u64,
        reconnect_grace_secs = config.session.reconnect_grace.as_secs(),
        "configuration loaded"
    );

    let server = BingoServerBuilder::from_config(config)
        .build(OpenIdentity)
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("bingo server stopped");
    Ok(())
}
