use anyhow::Context;
use futures::future::join_all;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use polisen_events::{
    config::{AppConfig, Config},
    controllers,
    services::{scheduler::spawn_refresh_loop, sensor::RefreshOutcome},
    AppState,
};

fn init_tracing(app: &AppConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&app.rust_log));

    if app.environment == "production" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.app);

    info!("Starting Polisen Events");

    let state = AppState::from_config(&config)?;
    if state.sensors.is_empty() {
        warn!("No sensors configured; only location suggestions will be served");
    }

    // --- Initial refresh, then one loop per sensor ---
    let initial = join_all(state.sensors.iter().map(|sensor| sensor.refresh())).await;
    for (sensor, outcome) in state.sensors.iter().zip(&initial) {
        if let RefreshOutcome::Failed(e) = outcome {
            warn!(sensor = %sensor.name(), error = %e, "Initial refresh failed, will retry on schedule");
        }
    }

    let loops: Vec<_> = state
        .sensors
        .iter()
        .map(|sensor| spawn_refresh_loop(sensor.clone(), sensor.config().update_interval))
        .collect();

    // --- Start the web server ---
    let app = controllers::app(state.clone());
    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.app.host, config.app.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.shutdown();
    join_all(loops).await;
    info!("Polisen Events stopped");

    Ok(())
}
