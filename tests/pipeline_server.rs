//! End-to-end tests through the HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use tierline::auth::{SignedHeaders, Signer, SigningSecret};
use tierline::client::{ClientError, PipelineClient};
use tierline::config::SignatureScheme;
use tierline::pipeline::ProgressReport;
use tierline::resilience::{Backoff, CancelToken, Fetched, RetryPolicy};
use tierline::tiers::TierStatus;

mod common;

fn signer(secret: &str) -> Signer {
    Signer::new(
        SigningSecret::new(secret).unwrap(),
        SignatureScheme::BodyAndTimestamp,
        Duration::from_secs(300),
    )
}

fn single_shot() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        warn_after: 1,
        backoff: Backoff::new(Duration::from_millis(10), 2.0, Duration::from_millis(10)),
    }
}

fn client(server: &common::TestServer) -> PipelineClient {
    PipelineClient::new(&server.url(), common::CALLER_KEY, signer(common::SECRET))
        .unwrap()
        .with_policy(single_shot())
        .with_admin_key(Some(common::ADMIN_KEY.to_string()))
}

/// Signed GET sent without the client, to inspect raw responses.
async fn signed_get(url: &str, caller_key: &str, secret: &str, request_id: Option<&str>) -> reqwest::Response {
    let envelope = signer(secret).seal(bytes::Bytes::new());
    let headers = SignedHeaders::from_envelope(&envelope, caller_key).to_header_map().unwrap();

    let mut request = reqwest::Client::new().get(url).headers(headers);
    if let Some(id) = request_id {
        request = request.header("x-request-id", id);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_settings_fall_back_to_second_tier() {
    let control = common::start_mock_backend(500, "").await;
    let workflow = common::start_mock_backend(200, r#"{"theme":"dark"}"#).await;
    let server = common::start_pipeline_server(common::pipeline_config(
        Some(control.url()),
        Some(workflow.url()),
        None,
    ))
    .await;

    let result = client(&server)
        .retrieve_settings("theme", &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(result, Fetched::Found(json!({"theme": "dark"})));
    assert_eq!(control.hits(), 1);
    assert_eq!(workflow.hits(), 1);
}

#[tokio::test]
async fn test_request_id_reaches_tiers_and_response() {
    let store = common::start_mock_backend(200, r#"{"v":1}"#).await;
    let server = common::start_pipeline_server(common::pipeline_config(None, None, Some(store.url()))).await;

    let url = format!("{}/api/v1/settings/theme", server.url());
    let response = signed_get(&url, common::CALLER_KEY, common::SECRET, Some("trace-me")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me")
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"data": {"v": 1}}));
    assert_eq!(store.requests()[0].header("x-request-id"), Some("trace-me"));

    // A generated id is returned when the caller sends none.
    let response = signed_get(&url, common::CALLER_KEY, common::SECRET, None).await;
    let generated = response.headers().get("x-request-id").and_then(|v| v.to_str().ok());
    assert!(generated.is_some_and(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[tokio::test]
async fn test_unsigned_and_mis_signed_requests_are_rejected() {
    let store = common::start_mock_backend(200, r#"{"v":1}"#).await;
    let server = common::start_pipeline_server(common::pipeline_config(None, None, Some(store.url()))).await;
    let url = format!("{}/api/v1/settings/theme", server.url());

    let unsigned = reqwest::Client::new().get(&url).send().await.unwrap();
    assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);
    let body: Value = unsigned.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    let wrong_key = signed_get(&url, "intruder", common::SECRET, None).await;
    assert_eq!(wrong_key.status(), StatusCode::UNAUTHORIZED);

    let wrong_secret = signed_get(&url, common::CALLER_KEY, "guessed", None).await;
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(store.hits(), 0);

    // The client treats 401 as terminal.
    let client = PipelineClient::new(&server.url(), common::CALLER_KEY, signer("guessed"))
        .unwrap()
        .with_policy(RetryPolicy {
            max_attempts: 5,
            ..single_shot()
        });
    let err = client
        .retrieve_settings("theme", &CancelToken::new())
        .await
        .unwrap_err();
    let ClientError::Retry(retry) = err else {
        panic!("expected a retry error");
    };
    assert_eq!(retry.attempts().len(), 1);
}

#[tokio::test]
async fn test_not_found_everywhere() {
    let control = common::start_mock_backend(404, "").await;
    let store = common::start_mock_backend(404, "").await;
    let server = common::start_pipeline_server(common::pipeline_config(
        Some(control.url()),
        None,
        Some(store.url()),
    ))
    .await;

    let result = client(&server)
        .retrieve_settings("nothing", &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(result, Fetched::NotFound);
}

#[tokio::test]
async fn test_failed_progress_is_queued_and_flushed() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let store = common::start_programmable_backend(move |_| {
        let up = flag.load(Ordering::SeqCst);
        async move {
            if up {
                (200, r#"{"accepted":true}"#.to_string())
            } else {
                (500, r#"{"error":"down"}"#.to_string())
            }
        }
    })
    .await;
    let server = common::start_pipeline_server(common::pipeline_config(None, None, Some(store.url()))).await;
    let client = client(&server);

    let report = ProgressReport::new("task-7", 40);
    let err = client
        .report_progress(&report, &CancelToken::new())
        .await
        .unwrap_err();

    let statuses: Vec<TierStatus> = err.outcomes().iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![TierStatus::Skipped, TierStatus::Skipped, TierStatus::Failed]);
    assert_eq!(server.controller.pending_task_ids(), vec!["task-7".to_string()]);

    let status = client.admin_status().await.unwrap();
    assert_eq!(status["pending_reports"], 1);

    healthy.store(true, Ordering::SeqCst);
    let summary = client.admin_flush().await.unwrap();
    assert_eq!(summary, json!({"delivered": 1, "dropped": 0, "remaining": 0}));
    assert_eq!(server.controller.pending_len(), 0);

    let delivered = store.requests().pop().unwrap();
    assert_eq!(delivered.path, "/tasks/task-7/progress");
    let body: Value = serde_json::from_slice(&delivered.body).unwrap();
    assert_eq!(body["percent"], 40);
}

#[tokio::test]
async fn test_admin_routes_require_bearer_key() {
    let server = common::start_pipeline_server(common::pipeline_config(None, None, None)).await;
    let http = reqwest::Client::new();

    let anonymous = http.get(format!("{}/admin/tiers", server.url())).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong = http
        .get(format!("{}/admin/tiers", server.url()))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let tiers = client(&server).admin_tiers().await.unwrap();
    let names: Vec<&str> = tiers
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["control", "workflow", "store"]);
    assert_eq!(tiers[0]["configured"], false);
}

#[tokio::test]
async fn test_admin_routes_absent_without_key() {
    let mut config = common::pipeline_config(None, None, None);
    config.admin.api_key = None;
    let server = common::start_pipeline_server(config).await;

    let response = reqwest::get(format!("{}/admin/status", server.url())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let health: Value = reqwest::get(format!("{}/health", server.url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok"}));
}
