use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use chrono::Duration;
use foodgram_sdk::{
    api::filters::{routes, ApiState},
    config::Config,
    jwt::SessionSigner,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    log::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!("Applying migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let signer = SessionSigner::new(
        config.jwt_secret.as_bytes(),
        Duration::hours(config.session_hours),
    )
    .map_err(|e| format!("Invalid JWT_SECRET: {e}"))?;
    let state = ApiState {
        pool,
        signer: Arc::new(signer),
        page_size: config.page_size,
    };

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())?;

    log::info!("Server running on {bound}");
    server.await;

    log::info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
}
