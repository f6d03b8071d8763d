//! CLI tests against a local mock API.
//!
//! Each test gets its own token file through `AUTHFETCH_STORE`, so nothing
//! touches the user's data directory.

mod common;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::CliEnv;

/// Run a blocking CLI invocation without stalling the mock server.
async fn run_success(env: &Arc<CliEnv>, args: &[&str]) -> String {
    let env = Arc::clone(env);
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        env.run_success(&args)
    })
    .await
    .expect("CLI task panicked")
}

async fn run_failure(env: &Arc<CliEnv>, args: &[&str]) -> String {
    let env = Arc::clone(env);
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        env.run_failure(&args)
    })
    .await
    .expect("CLI task panicked")
}

#[test]
fn test_authenticate_status_logout() {
    let env = CliEnv::new("http://localhost:1");

    let status = env.run_success(&["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["authenticated"], false);

    env.run_success(&[
        "authenticate",
        "--access-token",
        "access-1",
        "--refresh-token",
        "refresh-1",
    ]);
    let stored = env.stored();
    assert_eq!(stored["token"], "access-1");
    assert_eq!(stored["refresh"], "refresh-1");

    let status = env.run_success(&["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["refreshable"], true);

    env.run_success(&["logout"]);
    assert!(env.stored().is_empty());
}

#[test]
fn test_camel_case_keys() {
    let env = CliEnv::new("http://localhost:1");
    env.run_success(&[
        "--camel-case-keys",
        "authenticate",
        "--access-token",
        "a",
        "--refresh-token",
        "r",
    ]);

    let stored = env.stored();
    assert_eq!(stored["accessToken"], "a");
    assert_eq!(stored["refreshToken"], "r");
    assert!(!stored.contains_key("token"));
}

#[test]
fn test_refresh_without_session_fails() {
    let env = CliEnv::new("http://localhost:1");
    let stderr = env.run_failure(&["refresh"]);
    assert!(stderr.contains("authfetch authenticate"), "stderr: {stderr}");
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let env = CliEnv::new("ftp://example.com");
    let stderr = env.run_failure(&["status"]);
    assert!(stderr.contains("Invalid base URL"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_sends_bearer_and_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("x-client", "cli"))
        .and(query_param("page", "2"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;

    let env = Arc::new(CliEnv::new(&server.uri()));
    run_success(
        &env,
        &["authenticate", "--access-token", "access-1", "--refresh-token", "r"],
    )
    .await;

    let stdout = run_success(
        &env,
        &[
            "--default-param",
            "lang=en",
            "--default-header",
            "X-Client: cli",
            "get",
            "items",
            "--query",
            "page=2",
        ],
    )
    .await;

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body, json!({"items": [1, 2]}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_refreshes_expired_token_and_persists_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let env = Arc::new(CliEnv::new(&server.uri()));
    run_success(
        &env,
        &["authenticate", "--access-token", "stale", "--refresh-token", "refresh-1"],
    )
    .await;

    let stdout = run_success(&env, &["get", "me"]).await;
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["id"], 7);

    let stored = env.stored();
    assert_eq!(stored["token"], "fresh");
    assert_eq!(stored["refresh"], "refresh-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_refresh_clears_stored_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let env = Arc::new(CliEnv::new(&server.uri()));
    run_success(
        &env,
        &["authenticate", "--access-token", "a", "--refresh-token", "r"],
    )
    .await;

    let stderr = run_failure(&env, &["get", "me"]).await;
    assert!(stderr.contains("401"), "stderr: {stderr}");
    assert!(env.stored().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_merges_default_params_into_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"title": "hi", "lang": "en"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let env = Arc::new(CliEnv::new(&server.uri()));
    let stdout = run_success(
        &env,
        &[
            "--default-param",
            "lang=en",
            "post",
            "notes",
            "--body",
            r#"{"title":"hi"}"#,
        ],
    )
    .await;

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_writes_binary_response_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(header("content-type", "text/csv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "blob"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let env = Arc::new(CliEnv::new(&server.uri()));
    let input = env.dir.path().join("data.csv");
    let output = env.dir.path().join("out.pdf");
    std::fs::write(&input, "a,b\n1,2\n").unwrap();

    run_success(
        &env,
        &[
            "upload",
            "convert",
            input.to_str().unwrap(),
            "--content-type",
            "text/csv",
            "--output",
            output.to_str().unwrap(),
        ],
    )
    .await;

    assert_eq!(std::fs::read(&output).unwrap(), b"%PDF");
}
