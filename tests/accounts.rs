//! HTTP integration tests for accounts: register, login, me, deposit,
//! and removal.

use std::sync::Arc;

use coinpurse::api::routes::{app_router, AppState};
use coinpurse::ledger;
use coinpurse::market::MarketDataClient;

fn test_app_state() -> AppState {
    AppState {
        ledger: ledger::new_shared(),
        // Unroutable base URL: account tests never reach the provider.
        market: Arc::new(MarketDataClient::new("http://127.0.0.1:9", "test-key")),
        jwt_secret: b"test-jwt-secret".to_vec(),
        db: None,
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

fn register_body(login: &str) -> serde_json::Value {
    serde_json::json!({
        "login": login,
        "password": "secret123",
        "first_name": "Test",
        "last_name": "User",
        "email": format!("{login}@example.com"),
    })
}

async fn register_user(client: &reqwest::Client, base_url: &str, login: &str) -> String {
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&register_body(login))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    json.get("user_id").unwrap().as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_healthy() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "healthy");
}

#[tokio::test]
async fn register_returns_201_with_user_id() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&register_body("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("user_id").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn register_missing_field_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    // No email key at all.
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&serde_json::json!({
            "login": "alice",
            "password": "secret123",
            "first_name": "Alice",
            "last_name": "Doe",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn register_empty_login_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let mut body = register_body("alice");
    body["login"] = serde_json::json!("");
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn register_duplicate_login_returns_409() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register_user(&client, &base_url, "bob").await;

    let mut body = register_body("bob");
    body["email"] = serde_json::json!("different@example.com");
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("login"));
}

#[tokio::test]
async fn register_duplicate_email_returns_409() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register_user(&client, &base_url, "bob").await;

    let mut body = register_body("carol");
    body["email"] = serde_json::json!("bob@example.com");
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn register_then_login_returns_token_and_profile() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user_id = register_user(&client, &base_url, "carol").await;

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "carol", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("token").and_then(|v| v.as_str()).is_some());
    assert_eq!(json.get("user_id").and_then(|v| v.as_str()), Some(user_id.as_str()));
    assert_eq!(json.get("first_name").and_then(|v| v.as_str()), Some("Test"));
    assert_eq!(json.get("last_name").and_then(|v| v.as_str()), Some("User"));
    assert_eq!(json.get("cash_balance").and_then(|v| v.as_f64()), Some(0.0));
}

#[tokio::test]
async fn login_is_case_insensitive_on_login_name() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register_user(&client, &base_url, "Dave").await;

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "dave", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn login_wrong_password_returns_401() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register_user(&client, &base_url, "dave").await;

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "dave", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_unknown_user_returns_401() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "nobody", "password": "any" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn me_returns_profile_for_valid_token() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register_user(&client, &base_url, "erin").await;

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "erin", "password": "secret123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login.get("token").unwrap().as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/auth/me", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("login").and_then(|v| v.as_str()), Some("erin"));
    assert_eq!(
        json.get("email").and_then(|v| v.as_str()),
        Some("erin@example.com")
    );
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn me_without_token_returns_401() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::Client::new()
        .get(format!("{}/api/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn me_with_garbage_token_returns_401() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::Client::new()
        .get(format!("{}/api/auth/me", base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn deposit_updates_balance() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user_id = register_user(&client, &base_url, "frank").await;

    let res = client
        .post(format!("{}/api/account/deposit", base_url))
        .json(&serde_json::json!({ "user_id": user_id, "amount": 250 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("new_balance").and_then(|v| v.as_f64()), Some(250.0));

    // Deposits accumulate.
    let res = client
        .post(format!("{}/api/account/deposit", base_url))
        .json(&serde_json::json!({ "user_id": user_id, "amount": 50 }))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("new_balance").and_then(|v| v.as_f64()), Some(300.0));
}

#[tokio::test]
async fn deposit_non_positive_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user_id = register_user(&client, &base_url, "frank").await;

    for amount in [0, -10] {
        let res = client
            .post(format!("{}/api/account/deposit", base_url))
            .json(&serde_json::json!({ "user_id": user_id, "amount": amount }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn deposit_unknown_user_returns_404() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::Client::new()
        .post(format!("{}/api/account/deposit", base_url))
        .json(&serde_json::json!({ "user_id": uuid::Uuid::new_v4(), "amount": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn remove_user_then_login_fails() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user_id = register_user(&client, &base_url, "gone").await;

    let res = client
        .delete(format!("{}/api/users/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("message").unwrap().as_str().unwrap().contains("deleted"));

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "login": "gone", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .get(format!("{}/api/portfolio/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn remove_unknown_user_returns_404() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::Client::new()
        .delete(format!("{}/api/users/{}", base_url, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}
