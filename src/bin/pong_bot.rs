//! Pong Bot - headless networked client
//!
//! Joins a server, drives whatever paddle it is given with the heuristic
//! opponent, and reconnects when the connection drops.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pong_server::client::{network, BotConfig, HeuristicOpponent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = BotConfig::from_env()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(url = %config.server_url, "Starting Pong Bot");

    let opponent = HeuristicOpponent::default();

    tokio::select! {
        result = network::run(&config, &opponent) => {
            if let Err(e) = &result {
                error!(error = %e, "Bot stopped");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
