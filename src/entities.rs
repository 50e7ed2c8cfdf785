use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub todo: String,
    pub user_id: i64,
    pub creation_date: String,
}

#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
}

// keeps the password hash out of logs
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl axum_login::AuthUser for User {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    // when user changes password, auth session becomes invalid
    fn session_auth_hash(&self) -> &[u8] {
        self.password_hash.as_bytes()
    }
}

/// The part of an account that is safe to hand back to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// A form value that keeps track of whether it arrived as a string, so a
/// wrongly typed field is reported by name instead of failing the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormField {
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl FormField {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other(_) => None,
        }
    }
}

impl From<String> for FormField {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FormField {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegisterRequest {
    pub uname: Option<FormField>,
    pub username: Option<FormField>,
    pub email: Option<FormField>,
    pub password: Option<FormField>,
    pub phone: Option<FormField>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub todo: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTodoRequest {
    pub todo_id: Option<i64>,
    pub todo_text: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTodoRequest {
    pub todo_id: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReadTodoQuery {
    pub skip: Option<String>,
}
