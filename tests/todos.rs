mod common;

use common::{browser, create_todo, read_todos, send_json, signed_in, spawn_app};
use serde_json::json;
use todo_api::Config;

#[tokio::test]
async fn todo_routes_require_login() {
    let base = spawn_app(Config::ephemeral()).await;
    let client = browser();

    let body = read_todos(&client, &base, None).await;
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "You are not logged in. Please log in");

    let body = create_todo(&client, &base, "buy milk").await;
    assert_eq!(body["message"], "You are not logged in. Please log in");
}

#[tokio::test]
async fn todo_length_limit_is_200_characters() {
    let base = spawn_app(Config::ephemeral()).await;
    let client = signed_in(&base, "karl").await;

    let body = create_todo(&client, &base, &"a".repeat(201)).await;
    assert_eq!(body["status"], 400);
    assert_eq!(
        body["message"],
        "Todo text too long. Todo can be max 200 characters in length"
    );

    let body = create_todo(&client, &base, &"a".repeat(200)).await;
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "Successful");

    let body = create_todo(&client, &base, "").await;
    assert_eq!(body["message"], "Invalid Data");
}

#[tokio::test]
async fn read_todo_pages_by_five() {
    let base = spawn_app(Config::ephemeral()).await;
    let client = signed_in(&base, "karl").await;
    for i in 0..7 {
        assert_eq!(create_todo(&client, &base, &format!("todo {i}")).await["status"], 200);
    }

    let first = read_todos(&client, &base, Some("0")).await;
    assert_eq!(first["status"], 200);
    assert_eq!(first["message"], "Read Successful");
    assert_eq!(first["data"].as_array().unwrap().len(), 5);
    assert_eq!(first["data"][0]["todo"], "todo 0");
    assert!(first["data"][0]["userId"].is_i64());
    assert!(first["data"][0]["creationDate"].is_string());

    let rest = read_todos(&client, &base, Some("5")).await;
    let texts: Vec<_> = rest["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|todo| todo["todo"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["todo 5", "todo 6"]);

    let beyond = read_todos(&client, &base, Some("100")).await;
    assert_eq!(beyond["data"], json!([]));

    let garbage = read_todos(&client, &base, Some("abc")).await;
    assert_eq!(garbage["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn users_only_read_their_own_todos() {
    let base = spawn_app(Config::ephemeral()).await;
    let karl = signed_in(&base, "karl").await;
    let anna = signed_in(&base, "anna").await;

    create_todo(&karl, &base, "karl's").await;
    let body = read_todos(&anna, &base, None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn edit_and_delete_return_the_record() {
    let base = spawn_app(Config::ephemeral()).await;
    let client = signed_in(&base, "karl").await;
    create_todo(&client, &base, "buy milk").await;
    let todo_id = read_todos(&client, &base, None).await["data"][0]["id"].clone();

    let body = send_json(
        client.patch(format!("{base}/edit-todo")),
        json!({ "todoId": todo_id, "todoText": "buy oat milk" }),
    )
    .await;
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "Update Successful");
    assert_eq!(body["data"]["todo"], "buy oat milk");

    let body = send_json(
        client.patch(format!("{base}/edit-todo")),
        json!({ "todoId": todo_id, "todoText": "x".repeat(201) }),
    )
    .await;
    assert_eq!(body["status"], 400);

    let body = send_json(client.delete(format!("{base}/delete-todo")), json!({ "todoId": todo_id })).await;
    assert_eq!(body["message"], "Delete Successful");
    assert_eq!(body["data"]["todo"], "buy oat milk");

    // gone: still a success, with no record
    let body = send_json(client.delete(format!("{base}/delete-todo")), json!({ "todoId": todo_id })).await;
    assert_eq!(body["status"], 200);
    assert!(body["data"].is_null());

    let body = send_json(client.delete(format!("{base}/delete-todo")), json!({})).await;
    assert_eq!(body["message"], "Invalid Data");
}

#[tokio::test]
async fn edits_select_by_id_alone_by_default() {
    let base = spawn_app(Config::ephemeral()).await;
    let karl = signed_in(&base, "karl").await;
    let anna = signed_in(&base, "anna").await;
    create_todo(&karl, &base, "karl's").await;
    let todo_id = read_todos(&karl, &base, None).await["data"][0]["id"].clone();

    let body = send_json(
        anna.patch(format!("{base}/edit-todo")),
        json!({ "todoId": todo_id, "todoText": "anna was here" }),
    )
    .await;
    assert_eq!(body["data"]["todo"], "anna was here");
}

#[tokio::test]
async fn ownership_check_protects_foreign_todos() {
    let config = Config {
        todo_ownership_check: true,
        ..Config::ephemeral()
    };
    let base = spawn_app(config).await;
    let karl = signed_in(&base, "karl").await;
    let anna = signed_in(&base, "anna").await;
    create_todo(&karl, &base, "karl's").await;
    let todo_id = read_todos(&karl, &base, None).await["data"][0]["id"].clone();

    let body = send_json(
        anna.patch(format!("{base}/edit-todo")),
        json!({ "todoId": todo_id, "todoText": "anna was here" }),
    )
    .await;
    assert!(body["data"].is_null());
    let body = send_json(anna.delete(format!("{base}/delete-todo")), json!({ "todoId": todo_id })).await;
    assert!(body["data"].is_null());

    let body = read_todos(&karl, &base, None).await;
    assert_eq!(body["data"][0]["todo"], "karl's");
}
