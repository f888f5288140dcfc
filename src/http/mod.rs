//! HTTP surface: health check and WebSocket endpoint

pub mod routes;

pub use routes::build_router;
