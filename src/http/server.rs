//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the pipeline handlers
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Verify signed requests before they reach the controller
//! - Mount admin routes when an admin key is configured
//! - Serve until the shutdown token fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::auth::{verify_signed_request, AuthError, InboundVerifier, Signer};
use crate::config::PipelineConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestId, X_REQUEST_ID};
use crate::http::response::fetched_response;
use crate::pipeline::{CallContext, PipelineController, ProgressReport};
use crate::resilience::CancelToken;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PipelineController>,
    pub config: Arc<PipelineConfig>,
    pub started_at: Instant,
}

/// HTTP front end for the pipeline.
pub struct PipelineServer {
    router: Router,
    config: Arc<PipelineConfig>,
}

impl PipelineServer {
    /// Build the server. Fails closed when no signing secret is configured.
    pub fn new(config: PipelineConfig, controller: Arc<PipelineController>) -> Result<Self, AuthError> {
        let config = Arc::new(config);
        let signer = Signer::from_config(&config.signing)?;
        let verifier = Arc::new(InboundVerifier::new(
            signer,
            config.signing.caller_key.clone(),
            config.listener.max_body_bytes,
        ));

        let state = AppState {
            controller,
            config: config.clone(),
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state, verifier);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &PipelineConfig, state: AppState, verifier: Arc<InboundVerifier>) -> Router {
        let signed = Router::new()
            .route("/api/v1/settings/{key}", get(settings_handler))
            .route("/api/v1/tasks/{task_id}/progress", post(progress_handler))
            .route_layer(middleware::from_fn_with_state(verifier, verify_signed_request));

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .merge(signed);

        if config.admin.api_key.is_some() {
            router = router.merge(admin::setup_admin_router(state.clone()));
        } else {
            tracing::info!("No admin key configured, admin routes disabled");
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id
                    )
                }))
                .layer(propagate_request_id_layer())
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs))),
        )
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` is cancelled.
    pub async fn run(self, listener: TcpListener, shutdown: CancelToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tiers = self.config.tiers.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Cancel `shutdown` on Ctrl+C.
pub async fn shutdown_on_ctrl_c(shutdown: CancelToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
    shutdown.cancel();
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn settings_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(key): Path<String>,
) -> Response {
    let ctx = CallContext {
        request_id,
        ..CallContext::default()
    };
    let result = state.controller.retrieve_settings(&key, &ctx).await;
    fetched_response(result, StatusCode::OK)
}

/// Body of `POST /api/v1/tasks/{task_id}/progress`. The task id comes from the path.
#[derive(Debug, Deserialize)]
struct ProgressBody {
    #[serde(default)]
    status: Option<String>,
    percent: u8,
    #[serde(default)]
    message: Option<String>,
}

async fn progress_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(task_id): Path<String>,
    Json(body): Json<ProgressBody>,
) -> impl IntoResponse {
    let mut report = ProgressReport::new(task_id, body.percent);
    if let Some(status) = body.status {
        report.status = status;
    }
    report.message = body.message;

    let ctx = CallContext {
        request_id,
        ..CallContext::default()
    };
    let result = state.controller.report_progress(report, &ctx).await;
    fetched_response(result, StatusCode::ACCEPTED)
}
