mod common;

use std::time::Duration;

use common::{browser, spawn_app};
use todo_api::Config;

async fn get_root(client: &reqwest::Client, base: &str) -> String {
    client.get(format!("{base}/")).send().await.unwrap().text().await.unwrap()
}

#[tokio::test]
async fn root_allows_one_request_per_second_per_session() {
    let base = spawn_app(Config::ephemeral()).await;
    let client = browser();

    assert_eq!(get_root(&client, &base).await, "Welcome to our app");

    let body: serde_json::Value = serde_json::from_str(&get_root(&client, &base).await).unwrap();
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "Too many request. Please try after some time.");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(get_root(&client, &base).await, "Welcome to our app");
}

#[tokio::test]
async fn sessions_do_not_share_a_budget() {
    let base = spawn_app(Config::ephemeral()).await;
    let first = browser();
    let second = browser();

    assert_eq!(get_root(&first, &base).await, "Welcome to our app");
    assert_eq!(get_root(&second, &base).await, "Welcome to our app");
}

#[tokio::test]
async fn window_is_configurable() {
    let config = Config {
        rate_limit_window: Duration::from_millis(50),
        ..Config::ephemeral()
    };
    let base = spawn_app(config).await;
    let client = browser();

    assert_eq!(get_root(&client, &base).await, "Welcome to our app");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(get_root(&client, &base).await, "Welcome to our app");
}
