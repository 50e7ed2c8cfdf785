#![allow(dead_code)]

use serde_json::{json, Value};
use tokio::net::TcpListener;
use todo_api::{app_router, AppState, Config};

pub const PASSWORD: &str = "correct horse";

/// Serves the full router on an ephemeral port and returns its base url.
pub async fn spawn_app(config: Config) -> String {
    let sqlite_pool = todo_api::connect(&config.database_url).await.unwrap();
    let session_store = todo_api::migrate(&sqlite_pool).await.unwrap();
    let state = AppState::new(sqlite_pool, &config);
    let app = app_router(state, session_store, &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// A client that keeps its session cookie between requests.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn send_json(
    request: reqwest::RequestBuilder,
    body: Value,
) -> Value {
    request.json(&body).send().await.unwrap().json().await.unwrap()
}

pub async fn register(client: &reqwest::Client, base: &str, username: &str, email: &str) -> Value {
    send_json(
        client.post(format!("{base}/register")),
        json!({
            "uname": "Test User",
            "username": username,
            "email": email,
            "password": PASSWORD,
        }),
    )
    .await
}

pub async fn login(client: &reqwest::Client, base: &str, login_id: &str) -> Value {
    send_json(
        client.post(format!("{base}/login")),
        json!({ "loginId": login_id, "password": PASSWORD }),
    )
    .await
}

/// Registers and logs in a fresh browser.
pub async fn signed_in(base: &str, username: &str) -> reqwest::Client {
    let client = browser();
    let email = format!("{username}@example.com");
    assert_eq!(register(&client, base, username, &email).await["status"], 200);
    assert_eq!(login(&client, base, username).await["status"], 200);
    client
}

pub async fn create_todo(client: &reqwest::Client, base: &str, text: &str) -> Value {
    send_json(client.post(format!("{base}/create-todo")), json!({ "todo": text })).await
}

pub async fn read_todos(client: &reqwest::Client, base: &str, skip: Option<&str>) -> Value {
    let url = match skip {
        Some(skip) => format!("{base}/read-todo?skip={skip}"),
        None => format!("{base}/read-todo"),
    };
    client.get(url).send().await.unwrap().json().await.unwrap()
}
