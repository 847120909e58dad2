mod bootstrap;
mod health;
mod turn;

use anyhow::Result;

use tably_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use tably_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        app.runtime.sessions(),
    )
    .await?;

    bootstrap::spawn_background_tasks(&app);

    let turn_address =
        format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&turn_address).await?;
    tracing::info!(bind_address = %turn_address, "turn endpoint started");
    let router = turn::router(app.runtime.clone());
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router).await {
            tracing::error!(%error, "turn endpoint server terminated unexpectedly");
        }
    });

    tracing::info!("tably-server started");
    wait_for_shutdown().await?;
    tracing::info!("tably-server stopping");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
