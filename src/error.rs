use std::borrow::Cow;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::authentication::{self, SqliteAuthBackend};
use crate::rate_limit::RateLimitError;

pub const INVALID_DATA: &str = "Invalid Data";
pub const INTERNAL_ERROR: &str = "Internal Server Error. Please try again";
pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in";

/// Body shared by every JSON endpoint. `status` is advisory; the transport
/// status is always 200.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            status: StatusCode::OK.as_u16(),
            message: Cow::Borrowed(message),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: &'static str) -> Json<Self> {
        Json(Self {
            status: StatusCode::OK.as_u16(),
            message: Cow::Borrowed(message),
            data: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn invalid_data() -> Self {
        Self::bad_request(INVALID_DATA)
    }

    pub fn not_logged_in() -> Self {
        Self::bad_request(NOT_LOGGED_IN)
    }

    /// Store and runtime failures; the cause is logged by the caller and never
    /// leaves the process.
    pub fn internal() -> Self {
        Self::bad_request(INTERNAL_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            status: self.status.as_u16(),
            message: self.message,
            data: None,
        };
        Json(body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database query failed");
        Self::internal()
    }
}

impl From<authentication::Error> for ApiError {
    fn from(err: authentication::Error) -> Self {
        tracing::error!(error = %err, "auth backend failed");
        Self::internal()
    }
}

impl From<axum_login::Error<SqliteAuthBackend>> for ApiError {
    fn from(err: axum_login::Error<SqliteAuthBackend>) -> Self {
        tracing::error!(error = %err, "auth session failed");
        Self::internal()
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %err, "session store failed");
        Self::internal()
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::invalid_data()
    }
}

/// `axum::Json` whose rejection is reported through the JSON envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
