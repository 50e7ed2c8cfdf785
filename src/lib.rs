pub mod authentication;
pub mod config;
pub mod crud_ops;
pub mod entities;
pub mod error;
pub mod pages;
pub mod rate_limit;
pub mod router;
pub mod state;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

/// How often expired sessions are purged from the store.
const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

pub use config::Config;
pub use router::app_router;
pub use state::AppState;

/// Opens the database, creating the file when needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool_options = if is_in_memory(database_url) {
        // every connection to :memory: is a separate database, so keep exactly one alive
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };

    pool_options.connect_with(options).await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Creates the user and todo tables plus the session table.
pub async fn migrate(sqlite_pool: &SqlitePool) -> anyhow::Result<SqliteStore> {
    sqlx::migrate!().run(sqlite_pool).await?;

    let session_store = SqliteStore::new(sqlite_pool.clone());
    session_store.migrate().await?;

    Ok(session_store)
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let sqlite_pool = connect(&config.database_url).await?;
    let session_store = migrate(&sqlite_pool).await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_SWEEP_INTERVAL),
    );

    let state = AppState::new(sqlite_pool, &config);
    info!(
        rate_limit_ms = state.limiter.window().as_millis() as u64,
        todo_ownership_check = state.todo_ownership_check,
        "state ready"
    );

    let app = app_router(state, session_store, &config);
    let listener = TcpListener::bind(config.bind).await?;

    info!("listening on {}", listener.local_addr()?);
    let served = axum::serve(listener, app).await;

    deletion_task.abort();
    served?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:todos?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://todo.db"));
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let sqlite_pool = connect("sqlite::memory:").await.unwrap();
        migrate(&sqlite_pool).await.unwrap();
        migrate(&sqlite_pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'todos') ORDER BY name",
        )
        .fetch_all(&sqlite_pool)
        .await
        .unwrap();
        assert_eq!(tables, ["todos", "users"]);
    }
}
