use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::request::RequestId;
use crate::http::server::AppState;
use crate::pipeline::{CallContext, FlushSummary};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub configured_tiers: usize,
    pub pending_reports: usize,
    pub evicted_reports: u64,
}

#[derive(Debug, Serialize)]
pub struct TierStatusRow {
    pub name: String,
    pub configured: bool,
    pub timeout_ms: u64,
    pub auth: &'static str,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let controller = &state.controller;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        configured_tiers: controller.tiers().iter().filter(|t| t.is_configured()).count(),
        pending_reports: controller.pending_len(),
        evicted_reports: controller.pending_evicted(),
    })
}

pub async fn get_tiers(State(state): State<AppState>) -> Json<Vec<TierStatusRow>> {
    let rows = state
        .controller
        .tiers()
        .iter()
        .map(|t| TierStatusRow {
            name: t.name.clone(),
            configured: t.is_configured(),
            timeout_ms: t.timeout.as_millis() as u64,
            auth: t.auth.as_str(),
        })
        .collect();
    Json(rows)
}

pub async fn flush_pending(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Json<FlushSummary> {
    let ctx = CallContext {
        request_id,
        ..CallContext::default()
    };
    Json(state.controller.flush_pending(&ctx).await)
}
