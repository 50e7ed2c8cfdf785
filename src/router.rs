use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use axum_login::AuthManagerLayerBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::authentication::{login, logout, register, SqliteAuthBackend};
use crate::config::Config;
use crate::crud_ops::{create_todo, delete_todo, edit_todo, read_todos};
use crate::pages::{dashboard, login_page, profile, register_page, welcome};
use crate::rate_limit::limit_session_rate;
use crate::state::AppState;

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, session_store: SqliteStore, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(config.session_ttl))
        .with_signed(config.session_key.clone());
    let backend = SqliteAuthBackend::new(state.sqlite_pool.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let limited_routes = Router::new()
        .route("/", get(welcome))
        .route_layer(from_fn_with_state(state.clone(), limit_session_rate));

    let account_routes = Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/dashboard", get(dashboard));

    // the CurrentUser extractor in each handler does the auth check
    let todo_routes = Router::new()
        .route("/read-todo", get(read_todos))
        .route("/create-todo", post(create_todo))
        .route("/edit-todo", patch(edit_todo))
        .route("/delete-todo", delete(delete_todo));

    Router::new()
        .merge(limited_routes)
        .merge(account_routes)
        .merge(todo_routes)
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
