use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::rate_limit::SessionRateLimiter;

/// Shared application state for handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sqlite_pool: SqlitePool,
    pub limiter: Arc<SessionRateLimiter>,
    /// Restrict edit/delete to todos owned by the caller.
    pub todo_ownership_check: bool,
}

impl AppState {
    pub fn new(sqlite_pool: SqlitePool, config: &Config) -> Self {
        Self {
            sqlite_pool,
            limiter: Arc::new(SessionRateLimiter::new(config.rate_limit_window)),
            todo_ownership_check: config.todo_ownership_check,
        }
    }
}
