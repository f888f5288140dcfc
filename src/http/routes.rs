//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::game::GameStatus;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = state.config.client_origin.as_deref().map(|origins| {
        // Support multiple origins (comma-separated in CLIENT_ORIGIN)
        let allowed_origins: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    });

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick: u64,
    connected_clients: usize,
    game_status: GameStatus,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = &state.runtime.stats;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick: stats.tick(),
        connected_clients: stats.connected_clients(),
        game_status: stats.game_status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::game::{GameConfig, GameRuntime};
    use crate::store::LogResultStore;

    #[tokio::test]
    async fn health_reports_runtime_stats() {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            tick_rate: 60,
            countdown_ticks: 0,
            sim_seed: Some(1),
            input_rate_limit: 10,
            client_origin: Some("http://localhost:5173".to_string()),
        };
        let (_runtime, handle) = GameRuntime::new(
            GameConfig::default(),
            Arc::new(LogResultStore),
            Duration::from_millis(16),
        );
        let router = build_router(AppState::new(config, handle));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["connected_clients"], 0);
        assert_eq!(value["game_status"], "waiting");
    }
}
