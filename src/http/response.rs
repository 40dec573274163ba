//! Mapping pipeline results to HTTP responses.
//!
//! | result | status | body |
//! |---|---|---|
//! | `Found(v)` | 200 / 202 | `{"data": v}` |
//! | `NotFound` | 404 | `{"error": "not found"}` |
//! | `AllTiersFailed` | 502 | `{"error", "outcomes"}` |
//! | `InvalidRequest` | 400 | `{"error"}` |
//! | `Cancelled` | 503 | `{"error"}` |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::pipeline::PipelineError;
use crate::resilience::Fetched;

/// Render a pipeline result, using `success` for a found payload.
pub fn fetched_response(result: Result<Fetched<Value>, PipelineError>, success: StatusCode) -> Response {
    match result {
        Ok(Fetched::Found(data)) => (success, Json(json!({ "data": data }))).into_response(),
        Ok(Fetched::NotFound) => error_response(StatusCode::NOT_FOUND, "not found"),
        Err(e) => e.into_response(),
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        match self {
            PipelineError::AllTiersFailed(failed) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": failed.to_string(),
                    "outcomes": failed.outcomes,
                })),
            )
                .into_response(),
            PipelineError::InvalidRequest(_) => error_response(StatusCode::BAD_REQUEST, &self.to_string()),
            PipelineError::Cancelled => error_response(StatusCode::SERVICE_UNAVAILABLE, &self.to_string()),
            e => {
                tracing::error!(error = %e, "Pipeline misconfigured");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}
