//! Sphere Asteroids Server - authoritative game server
//!
//! This is the main entry point for the game server. It handles:
//! - The fixed-rate simulation loop for ship, projectiles and asteroids
//! - WebSocket connections carrying input and per-tick state
//! - A health check endpoint for orchestration

mod app;
mod config;
mod game;
mod http;
mod store;
mod util;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::{GameRuntime, RuntimeHandle};
use crate::http::build_router;
use crate::store::LogResultStore;
use crate::util::time::{init_server_time, tick_duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Sphere Asteroids Server");
    info!("Server address: {}", config.server_addr);
    info!(
        tick_rate = config.tick_rate,
        countdown_ticks = config.countdown_ticks,
        "Simulation settings"
    );

    // Spawn the authoritative runtime
    let (runtime, handle) = GameRuntime::new(
        config.game_config(),
        Arc::new(LogResultStore),
        tick_duration(config.tick_rate),
    );
    let runtime_task = tokio::spawn(runtime.run());

    // Build router
    let addr: SocketAddr = config.server_addr;
    let router = build_router(AppState::new(config, handle.clone()));

    // Start server
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(handle))
        .await?;

    runtime_task.await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging; `LOG_FORMAT=json` selects structured output
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Graceful shutdown signal handler; stops the tick loop before the server exits
async fn shutdown_signal(runtime: RuntimeHandle) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }

    runtime.stop();
}
