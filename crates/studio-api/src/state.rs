use std::sync::Arc;

use studio_engine::RoomPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RoomPipeline>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: RoomPipeline, config: ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }
}
