use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tower_sessions::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Session key written for visitors that have no stored session yet.
pub const FIRST_SEEN_KEY: &str = "first_seen";

const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Bad Request")]
    MissingSession,
    #[error("Too many request. Please try after some time.")]
    TooFrequent,
}

/// Allows one request per session per `window`, remembering the last
/// accepted access of each session.
#[derive(Debug)]
pub struct SessionRateLimiter {
    window: Duration,
    last_access: Mutex<HashMap<String, Instant>>,
    sweep_threshold: usize,
}

impl SessionRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_access: Mutex::new(HashMap::new()),
            sweep_threshold: SWEEP_THRESHOLD,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn check(&self, session_id: Option<&str>) -> Result<(), RateLimitError> {
        self.check_at(session_id, Instant::now()).await
    }

    /// Rejected calls leave the recorded time untouched, so the window is
    /// measured from the last accepted call.
    pub async fn check_at(&self, session_id: Option<&str>, now: Instant) -> Result<(), RateLimitError> {
        let session_id = session_id.ok_or(RateLimitError::MissingSession)?;
        let mut table = self.last_access.lock().await;

        if let Some(last) = table.get(session_id) {
            if now.saturating_duration_since(*last) < self.window {
                return Err(RateLimitError::TooFrequent);
            }
        }
        table.insert(session_id.to_owned(), now);

        // entries older than the window behave exactly like absent ones
        if table.len() > self.sweep_threshold {
            let window = self.window;
            table.retain(|_, last| now.saturating_duration_since(*last) < window);
        }
        Ok(())
    }

    pub async fn forget(&self, session_id: &str) {
        self.last_access.lock().await.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.last_access.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Middleware for routes limited per session.
pub async fn limit_session_rate(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = resolve_session_id(&session).await;
    if let Err(err) = state.limiter.check(session_id.as_deref()).await {
        tracing::debug!(session_id = ?session_id, error = %err, "request rate limited");
        return Err(err.into());
    }
    Ok(next.run(request).await)
}

/// A visitor without a stored session gets one here so there is an id to
/// key on. `None` means the store could not provide one.
async fn resolve_session_id(session: &Session) -> Option<String> {
    if session.id().is_none() {
        let started = chrono::Utc::now().to_rfc3339();
        if let Err(err) = session.insert(FIRST_SEEN_KEY, started).await {
            tracing::warn!(error = %err, "failed to mark new session");
            return None;
        }
        if let Err(err) = session.save().await {
            tracing::warn!(error = %err, "failed to store new session");
            return None;
        }
    }
    session.id().map(|id| id.to_string())
}
