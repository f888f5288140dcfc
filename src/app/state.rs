//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RuntimeHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runtime: RuntimeHandle,
}

impl AppState {
    pub fn new(config: Config, runtime: RuntimeHandle) -> Self {
        Self {
            config: Arc::new(config),
            runtime,
        }
    }
}
