pub mod config;
pub mod rest;
pub mod storage;

use std::sync::Arc;

use config::ServerConfig;
use storage::TaskStore;

/// Shared application state handed to every REST handler.
///
/// Handlers never touch the database directly; the store exclusively owns
/// persistence.
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<TaskStore>,
    pub started_at: std::time::Instant,
}
