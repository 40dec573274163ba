//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tierline::config::{PipelineConfig, TierAuthKind, TierConfig};
use tierline::http::PipelineServer;
use tierline::pipeline::PipelineController;
use tierline::resilience::CancelToken;

pub const SECRET: &str = "integration-secret";
pub const CALLER_KEY: &str = "dashboard";
pub const ADMIN_KEY: &str = "admin-secret-key";

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Handle to a running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a mock backend that always returns the same reply.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

/// Start a backend whose replies are computed per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                recorded.lock().unwrap().push(request.clone());

                let (status, body) = f(request).await;
                let reason = axum::http::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend { addr, requests }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Reply that never arrives within any test timeout.
pub async fn hang() -> (u16, String) {
    tokio::time::sleep(Duration::from_secs(30)).await;
    (200, "{}".to_string())
}

/// Pipeline config pointing the three default tiers at the given URLs.
pub fn pipeline_config(control: Option<String>, workflow: Option<String>, store: Option<String>) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.signing.secret = Some(SECRET.to_string());
    config.signing.caller_key = CALLER_KEY.to_string();
    config.admin.api_key = Some(ADMIN_KEY.to_string());

    let mut control_tier = TierConfig::new("control", TierAuthKind::Bearer);
    control_tier.base_url = control;
    control_tier.api_key = Some("control-token".to_string());
    control_tier.timeout_ms = 300;

    let mut workflow_tier = TierConfig::new("workflow", TierAuthKind::Signed);
    workflow_tier.base_url = workflow;
    workflow_tier.timeout_ms = 300;

    let mut store_tier = TierConfig::new("store", TierAuthKind::ApiKey);
    store_tier.base_url = store;
    store_tier.api_key = Some("store-key".to_string());
    store_tier.timeout_ms = 300;

    config.tiers = vec![control_tier, workflow_tier, store_tier];
    config
}

/// A running pipeline server.
pub struct TestServer {
    pub addr: SocketAddr,
    pub controller: Arc<PipelineController>,
    shutdown: CancelToken,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Start the real server on an ephemeral port.
pub async fn start_pipeline_server(config: PipelineConfig) -> TestServer {
    let controller = Arc::new(PipelineController::from_config(&config).unwrap());
    let server = PipelineServer::new(config, controller.clone()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancelToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, token).await;
    });

    TestServer {
        addr,
        controller,
        shutdown,
    }
}
