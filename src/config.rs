use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tower_sessions::cookie::Key;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://todo.db";
const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;
/// Minimum length accepted by `Key::from`.
const SESSION_SECRET_MIN_LEN: usize = 64;

#[derive(Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub database_url: String,
    /// Signs the session cookie.
    pub session_key: Key,
    /// Sessions expire after this much inactivity.
    pub session_ttl: time::Duration,
    pub rate_limit_window: Duration,
    pub todo_ownership_check: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let bind = parse_var("TODO_BIND").unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let session_key = match env::var("TODO_SESSION_SECRET") {
            Ok(secret) if secret.len() >= SESSION_SECRET_MIN_LEN => Key::from(secret.as_bytes()),
            Ok(_) => {
                warn!(
                    "TODO_SESSION_SECRET shorter than {SESSION_SECRET_MIN_LEN} bytes; \
                     generating a random key for this run"
                );
                Key::generate()
            }
            Err(_) => {
                info!("TODO_SESSION_SECRET not set; generating a random key for this run");
                Key::generate()
            }
        };

        let session_ttl = time::Duration::seconds(
            positive_var("TODO_SESSION_TTL_SECS").unwrap_or(DEFAULT_SESSION_TTL_SECS),
        );
        let rate_limit_window = Duration::from_millis(
            parse_var("TODO_RATE_LIMIT_MS").unwrap_or(DEFAULT_RATE_LIMIT_MS),
        );
        let todo_ownership_check = parse_var("TODO_OWNERSHIP_CHECK").unwrap_or(false);

        Self {
            bind,
            database_url,
            session_key,
            session_ttl,
            rate_limit_window,
            todo_ownership_check,
        }
    }

    /// Defaults with an in-memory database and a throwaway key.
    pub fn ephemeral() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "sqlite::memory:".to_string(),
            session_key: Key::generate(),
            session_ttl: time::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            todo_ownership_check: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("database_url", &self.database_url)
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("todo_ownership_check", &self.todo_ownership_check)
            .finish_non_exhaustive()
    }
}

/// Unset variables yield `None`; unparsable ones are logged and ignored.
fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring invalid value, using default");
            None
        }
    }
}

fn positive_var(name: &str) -> Option<i64> {
    let value = parse_var::<i64>(name)?;
    if value <= 0 {
        warn!(variable = name, value, "ignoring non-positive value, using default");
        return None;
    }
    Some(value)
}
