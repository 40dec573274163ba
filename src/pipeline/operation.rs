//! Pipeline operations and their tier requests.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;
use crate::tiers::transport::TierRequest;

/// A task progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub task_id: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_status() -> String {
    "running".to_string()
}

impl ProgressReport {
    pub fn new(task_id: impl Into<String>, percent: u8) -> Self {
        Self {
            task_id: task_id.into(),
            status: default_status(),
            percent,
            message: None,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.task_id.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("task id must not be empty".into()));
        }
        if self.percent > 100 {
            return Err(PipelineError::InvalidRequest(format!(
                "percent must be between 0 and 100, got {}",
                self.percent
            )));
        }
        Ok(())
    }
}

/// One authenticated, multi-tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `GET /settings/{key}` on each tier.
    RetrieveSettings { key: String },
    /// `POST /tasks/{task_id}/progress` on each tier.
    ReportProgress(ProgressReport),
}

impl Operation {
    /// Metric and log label.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RetrieveSettings { .. } => "retrieve_settings",
            Operation::ReportProgress(_) => "report_progress",
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        match self {
            Operation::RetrieveSettings { key } if key.trim().is_empty() => {
                Err(PipelineError::InvalidRequest("settings key must not be empty".into()))
            }
            Operation::RetrieveSettings { .. } => Ok(()),
            Operation::ReportProgress(report) => report.validate(),
        }
    }

    pub fn to_tier_request(&self) -> Result<TierRequest, PipelineError> {
        match self {
            Operation::RetrieveSettings { key } => Ok(TierRequest::get(["settings", key.as_str()])),
            Operation::ReportProgress(report) => {
                let body = serde_json::to_vec(report)
                    .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
                Ok(TierRequest::post_json(
                    ["tasks", report.task_id.as_str(), "progress"],
                    Bytes::from(body),
                ))
            }
        }
    }
}
