use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use tower_sessions::Session;
use validator::ValidateEmail;

use crate::entities::{FormField, LoginRequest, RegisterRequest, User, UserSummary};
use crate::error::{ApiError, ApiResponse, JsonBody};
use crate::state::AppState;

pub type AuthSession = axum_login::AuthSession<SqliteAuthBackend>;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    pub login_id: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct SqliteAuthBackend {
    pub sqlite_pool: sqlx::SqlitePool,
}

impl SqliteAuthBackend {
    pub fn new(sqlite_pool: sqlx::SqlitePool) -> Self {
        Self { sqlite_pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as("select * from users where email = ?")
            .bind(email)
            .fetch_optional(&self.sqlite_pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as("select * from users where username = ?")
            .bind(username)
            .fetch_optional(&self.sqlite_pool)
            .await?;
        Ok(user)
    }

    /// `login_id` is an email address or a username.
    pub async fn find_by_login_id(&self, login_id: &str) -> Result<Option<User>, Error> {
        if login_id.validate_email() {
            self.find_by_email(login_id).await
        } else {
            self.find_by_username(login_id).await
        }
    }

    pub async fn insert_user(
        &self,
        registration: &Registration<'_>,
        password_hash: String,
    ) -> Result<User, Error> {
        let user = sqlx::query_as(
            "insert into users (name, username, email, password_hash, phone) \
             values (?, ?, ?, ?, ?) returning *",
        )
        .bind(registration.name)
        .bind(registration.username)
        .bind(registration.email)
        .bind(password_hash)
        .bind(registration.phone)
        .fetch_one(&self.sqlite_pool)
        .await?;
        Ok(user)
    }
}

#[async_trait::async_trait]
impl axum_login::AuthnBackend for SqliteAuthBackend {
    type User = crate::entities::User;
    type Credentials = self::Credentials;
    type Error = self::Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(user) = self.find_by_login_id(&creds.login_id).await? else {
            return Ok(None);
        };
        let matches = verify_password(creds.password, user.password_hash.clone()).await?;
        Ok(matches.then_some(user))
    }

    async fn get_user(
        &self,
        user_id: &axum_login::UserId<Self>,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user = sqlx::query_as("select * from users where id = ?")
            .bind(user_id)
            .fetch_optional(&self.sqlite_pool)
            .await?;

        Ok(user)
    }
}

// argon2 is CPU bound, keep it off the async workers
async fn hash_password(password: String) -> Result<String, Error> {
    Ok(tokio::task::spawn_blocking(move || password_auth::generate_hash(password)).await?)
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, Error> {
    Ok(tokio::task::spawn_blocking(move || {
        password_auth::verify_password(password, &password_hash).is_ok()
    })
    .await?)
}

/// Rejects the request unless the session belongs to a logged in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                tracing::error!("auth session missing from request, is the auth layer installed?");
                ApiError::internal()
            })?;

        auth_session
            .user
            .map(CurrentUser)
            .ok_or_else(ApiError::not_logged_in)
    }
}

/// A registration that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: Option<&'a str>,
}

/// Missing or non-string fields are reported with `message`.
fn text_field<'a>(field: &'a Option<FormField>, message: &'static str) -> Result<&'a str, ApiError> {
    field
        .as_ref()
        .and_then(FormField::as_text)
        .ok_or_else(|| ApiError::bad_request(message))
}

/// Checks run in order and the first failure is the one reported.
pub fn validate_registration(req: &RegisterRequest) -> Result<Registration<'_>, ApiError> {
    let email = text_field(&req.email, "Invalid Email")?;
    let username = text_field(&req.username, "Invalid Username")?;
    let name = text_field(&req.uname, "Invalid Name")?;
    let password = text_field(&req.password, "Invalid Password")?;

    if [email, username, name, password].iter().any(|field| field.is_empty()) {
        return Err(ApiError::invalid_data());
    }
    if !(3..=100).contains(&username.chars().count()) {
        return Err(ApiError::bad_request(
            "Username should be 3 to 100 characters in length",
        ));
    }
    if !(8..=100).contains(&password.chars().count()) {
        return Err(ApiError::bad_request(
            "Password should be 8 to 100 characters in length",
        ));
    }
    if !email.validate_email() {
        return Err(ApiError::bad_request("Invalid Email"));
    }
    let phone = match &req.phone {
        Some(_) => Some(text_field(&req.phone, "Invalid Phone")?),
        None => None,
    };
    if phone.is_some_and(|phone| phone.chars().count() != 10) {
        return Err(ApiError::bad_request("Invalid Phone"));
    }

    Ok(Registration {
        name,
        username,
        email,
        password,
        phone,
    })
}

pub async fn register(
    auth_session: AuthSession,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let registration = validate_registration(&req)?;
    let backend = &auth_session.backend;

    if backend.find_by_email(registration.email).await?.is_some() {
        return Err(ApiError::bad_request("User with email already exists"));
    }
    if backend.find_by_username(registration.username).await?.is_some() {
        return Err(ApiError::bad_request("Username already taken"));
    }

    let password_hash = hash_password(registration.password.to_owned()).await?;
    let user = backend.insert_user(&registration, password_hash).await?;
    tracing::info!(user_id = user.id, username = %user.username, "registered user");

    Ok(ApiResponse::ok("Registration Successful", UserSummary::from(&user)))
}

pub async fn login(
    mut auth_session: AuthSession,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let (login_id, password) = match (req.login_id, req.password) {
        (Some(login_id), Some(password)) if !login_id.is_empty() && !password.is_empty() => {
            (login_id, password)
        }
        _ => return Err(ApiError::invalid_data()),
    };

    let user = auth_session
        .backend
        .find_by_login_id(&login_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("User not found"))?;

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "login rejected, wrong password");
        return Err(ApiError::bad_request("Invalid Password"));
    }

    auth_session.login(&user).await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(ApiResponse::message("Logged in successfully"))
}

pub async fn logout(
    State(state): State<AppState>,
    mut auth_session: AuthSession,
    session: Session,
) -> Result<&'static str, ApiError> {
    // read before logout flushes the session
    let session_id = session.id();
    auth_session.logout().await?;
    if let Some(session_id) = session_id {
        state.limiter.forget(&session_id.to_string()).await;
    }
    Ok("You are successfully logged out")
}
