//! Application state shared across handlers.

use std::sync::Arc;

use llmgate_engine::ModelHandle;

use crate::config::ServerConfig;
use crate::session_manager::SessionManager;

#[derive(Clone)]
pub struct AppState {
    /// Process-wide lazy engine handle.
    pub model: Arc<ModelHandle>,
    pub config: ServerConfig,
    /// Session lifecycle manager (concurrency + cancellation).
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(model: ModelHandle, config: ServerConfig) -> Self {
        let sessions = SessionManager::with_backlog(
            config.max_concurrent_sessions,
            config.max_background_backlog,
        );
        Self {
            model: Arc::new(model),
            config,
            sessions,
        }
    }
}
