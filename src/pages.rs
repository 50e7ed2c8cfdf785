use axum::response::{Html, IntoResponse, Response};

use crate::authentication::AuthSession;
use crate::error::NOT_LOGGED_IN;

const LOGIN_PAGE: &str = include_str!("../templates/login.html");
const REGISTER_PAGE: &str = include_str!("../templates/register.html");
const DASHBOARD_PAGE: &str = include_str!("../templates/dashboard.html");

pub async fn welcome() -> &'static str {
    "Welcome to our app"
}

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

pub async fn register_page() -> Html<&'static str> {
    Html(REGISTER_PAGE)
}

pub async fn profile(auth_session: AuthSession) -> String {
    match auth_session.user {
        Some(user) => format!("Welcome {} to profile", user.username),
        None => NOT_LOGGED_IN.to_string(),
    }
}

pub async fn dashboard(auth_session: AuthSession) -> Response {
    match auth_session.user {
        Some(_) => Html(DASHBOARD_PAGE).into_response(),
        None => NOT_LOGGED_IN.into_response(),
    }
}
