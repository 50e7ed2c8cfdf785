use axum::extract::{Query, State};
use axum::Json;
use sqlx::sqlite::SqlitePool;

use crate::authentication::CurrentUser;
use crate::entities::{CreateTodoRequest, DeleteTodoRequest, EditTodoRequest, ReadTodoQuery, Todo};
use crate::error::{ApiError, ApiResponse, JsonBody};
use crate::state::AppState;

/// Todos returned per read-todo call.
pub const PAGE_SIZE: i64 = 5;
pub const MAX_TODO_CHARS: usize = 200;
pub const MAX_TODOS_PER_USER: i64 = 1000;

const TODO_TOO_LONG: &str = "Todo text too long. Todo can be max 200 characters in length";
const QUOTA_REACHED: &str =
    "You have already created 1000 todos. Please delete old todos to create new ones";

pub fn validate_todo_text(text: Option<&str>) -> Result<&str, ApiError> {
    let text = text
        .filter(|text| !text.is_empty())
        .ok_or_else(ApiError::invalid_data)?;
    if text.chars().count() > MAX_TODO_CHARS {
        return Err(ApiError::bad_request(TODO_TOO_LONG));
    }
    Ok(text)
}

/// Absent, negative or garbage `skip` values read as 0.
pub fn parse_skip(raw: Option<&str>) -> i64 {
    raw.and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|skip| *skip >= 0)
        .unwrap_or(0)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub async fn count_todos(sqlite_pool: &SqlitePool, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM todos WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(sqlite_pool)
        .await
}

pub async fn insert_todo(sqlite_pool: &SqlitePool, user_id: i64, text: &str) -> sqlx::Result<Todo> {
    sqlx::query_as(
        "INSERT INTO todos (todo, user_id, creation_date) VALUES (?, ?, ?) \
         RETURNING id, todo, user_id, creation_date",
    )
    .bind(text)
    .bind(user_id)
    .bind(now())
    .fetch_one(sqlite_pool)
    .await
}

// Same as: SELECT * FROM todos WHERE user_id = ? LIMIT 5 OFFSET skip
pub async fn fetch_page(sqlite_pool: &SqlitePool, user_id: i64, skip: i64) -> sqlx::Result<Vec<Todo>> {
    sqlx::query_as(
        "SELECT id, todo, user_id, creation_date FROM todos WHERE user_id = ? \
         ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(PAGE_SIZE)
    .bind(skip)
    .fetch_all(sqlite_pool)
    .await
}

/// With `owner` unset any todo matching `todo_id` is updated.
pub async fn update_todo_text(
    sqlite_pool: &SqlitePool,
    todo_id: i64,
    owner: Option<i64>,
    text: &str,
) -> sqlx::Result<Option<Todo>> {
    sqlx::query_as(
        "UPDATE todos SET todo = ?, creation_date = ? \
         WHERE id = ? AND (? IS NULL OR user_id = ?) \
         RETURNING id, todo, user_id, creation_date",
    )
    .bind(text)
    .bind(now())
    .bind(todo_id)
    .bind(owner)
    .bind(owner)
    .fetch_optional(sqlite_pool)
    .await
}

pub async fn remove_todo(
    sqlite_pool: &SqlitePool,
    todo_id: i64,
    owner: Option<i64>,
) -> sqlx::Result<Option<Todo>> {
    sqlx::query_as(
        "DELETE FROM todos WHERE id = ? AND (? IS NULL OR user_id = ?) \
         RETURNING id, todo, user_id, creation_date",
    )
    .bind(todo_id)
    .bind(owner)
    .bind(owner)
    .fetch_optional(sqlite_pool)
    .await
}

/// Validates and stores a new todo, enforcing the per-user quota.
pub async fn create_for_user(
    sqlite_pool: &SqlitePool,
    user_id: i64,
    text: Option<&str>,
) -> Result<Todo, ApiError> {
    let text = validate_todo_text(text)?;

    // count-then-insert: concurrent creates may overshoot the cap slightly
    if count_todos(sqlite_pool, user_id).await? >= MAX_TODOS_PER_USER {
        return Err(ApiError::bad_request(QUOTA_REACHED));
    }

    Ok(insert_todo(sqlite_pool, user_id, text).await?)
}

pub async fn read_todos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReadTodoQuery>,
) -> Result<Json<ApiResponse<Vec<Todo>>>, ApiError> {
    let skip = parse_skip(query.skip.as_deref());
    let todos = fetch_page(&state.sqlite_pool, user.id, skip).await?;

    Ok(ApiResponse::ok("Read Successful", todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let todo = create_for_user(&state.sqlite_pool, user.id, req.todo.as_deref()).await?;
    tracing::debug!(user_id = user.id, todo_id = todo.id, "created todo");

    Ok(ApiResponse::message("Successful"))
}

pub async fn edit_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<EditTodoRequest>,
) -> Result<Json<ApiResponse<Option<Todo>>>, ApiError> {
    let todo_id = req.todo_id.ok_or_else(ApiError::invalid_data)?;
    let text = validate_todo_text(req.todo_text.as_deref())?;
    let owner = state.todo_ownership_check.then_some(user.id);

    let updated = update_todo_text(&state.sqlite_pool, todo_id, owner, text).await?;
    if updated.is_none() {
        tracing::debug!(user_id = user.id, todo_id, "edit matched no todo");
    }

    Ok(ApiResponse::ok("Update Successful", updated))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<DeleteTodoRequest>,
) -> Result<Json<ApiResponse<Option<Todo>>>, ApiError> {
    let todo_id = req.todo_id.ok_or_else(ApiError::invalid_data)?;
    let owner = state.todo_ownership_check.then_some(user.id);

    let deleted = remove_todo(&state.sqlite_pool, todo_id, owner).await?;
    if deleted.is_none() {
        tracing::debug!(user_id = user.id, todo_id, "delete matched no todo");
    }

    Ok(ApiResponse::ok("Delete Successful", deleted))
}
