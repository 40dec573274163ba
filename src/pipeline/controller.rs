//! Pipeline controller: one operation in, one uniform result out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Signer;
use crate::config::schema::PipelineConfig;
use crate::observability::metrics;
use crate::pipeline::operation::{Operation, ProgressReport};
use crate::pipeline::queue::PendingQueue;
use crate::pipeline::PipelineError;
use crate::resilience::{CancelToken, Fetched};
use crate::tiers::{build_tier_table, HttpTransport, ResolveError, TierDescriptor, TierResolver, TierTransport};

/// Per-call context supplied by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub request_id: Option<String>,
    pub cancel: CancelToken,
}

impl CallContext {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            cancel: CancelToken::new(),
        }
    }
}

/// Result of a flush of the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub delivered: usize,
    /// Reports a tier answered 404 for; they are not retried.
    pub dropped: usize,
    pub remaining: usize,
}

/// Composes the resolver with the pending-report queue.
#[derive(Debug)]
pub struct PipelineController {
    resolver: TierResolver,
    pending: Mutex<PendingQueue>,
    flush_lock: tokio::sync::Mutex<()>,
}

impl PipelineController {
    pub fn new(resolver: TierResolver, queue_capacity: usize) -> Self {
        Self {
            resolver,
            pending: Mutex::new(PendingQueue::new(queue_capacity)),
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Build the controller with the HTTP transport. Fails without a signing secret.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let transport = HttpTransport::new(&config.signing.caller_key)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: &PipelineConfig, transport: Arc<dyn TierTransport>) -> Result<Self, PipelineError> {
        let signer = Signer::from_config(&config.signing)?;
        let tiers = build_tier_table(&config.tiers, &signer)?;
        Ok(Self::new(TierResolver::new(tiers, transport), config.queue.capacity))
    }

    pub fn tiers(&self) -> &[TierDescriptor] {
        self.resolver.tiers()
    }

    pub async fn retrieve_settings(&self, key: &str, ctx: &CallContext) -> Result<Fetched<Value>, PipelineError> {
        self.execute(&Operation::RetrieveSettings { key: key.to_string() }, ctx)
            .await
    }

    /// Deliver a progress report; on total failure it is queued for a later flush.
    pub async fn report_progress(&self, report: ProgressReport, ctx: &CallContext) -> Result<Fetched<Value>, PipelineError> {
        let operation = Operation::ReportProgress(report);
        let result = self.execute(&operation, ctx).await;

        if let (Err(PipelineError::AllTiersFailed(_)), Operation::ReportProgress(report)) = (&result, operation) {
            self.enqueue(report);
        }
        result
    }

    /// Run one operation through the tiers.
    pub async fn execute(&self, operation: &Operation, ctx: &CallContext) -> Result<Fetched<Value>, PipelineError> {
        operation.validate()?;
        let request_id = ctx
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = operation
            .to_tier_request()?
            .with_request_id(Some(request_id.clone()));

        let result = match self.resolver.resolve(&request, &ctx.cancel).await {
            Ok(resolved) => {
                tracing::debug!(
                    operation = operation.name(),
                    tier = %resolved.tier,
                    request_id = %request_id,
                    "Served by tier"
                );
                Ok(Fetched::Found(resolved.value))
            }
            Err(ResolveError::AllTiersFailed(failed)) if failed.any_not_found() => Ok(Fetched::NotFound),
            Err(ResolveError::AllTiersFailed(failed)) => {
                tracing::warn!(
                    operation = operation.name(),
                    request_id = %request_id,
                    attempted = failed.attempted(),
                    "All tiers failed"
                );
                Err(PipelineError::AllTiersFailed(failed))
            }
            Err(ResolveError::Cancelled) => Err(PipelineError::Cancelled),
        };

        let label = match &result {
            Ok(Fetched::Found(_)) => "found",
            Ok(Fetched::NotFound) => "not_found",
            Err(PipelineError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::record_pipeline_request(operation.name(), label);

        result
    }

    fn queue(&self) -> MutexGuard<'_, PendingQueue> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, report: ProgressReport) {
        let mut queue = self.queue();
        let task_id = report.task_id.clone();
        if let Some(evicted) = queue.push(report) {
            metrics::record_pending_eviction();
            tracing::warn!(
                task_id = %evicted.report.task_id,
                capacity = queue.capacity(),
                "Pending queue full, dropped oldest report"
            );
        }
        metrics::set_pending_reports(queue.len());
        tracing::info!(task_id = %task_id, depth = queue.len(), "Progress report queued for retry");
    }

    pub fn pending_len(&self) -> usize {
        self.queue().len()
    }

    pub fn pending_evicted(&self) -> u64 {
        self.queue().evicted()
    }

    /// Queued task ids, oldest first.
    pub fn pending_task_ids(&self) -> Vec<String> {
        self.queue().iter().map(|e| e.report.task_id.clone()).collect()
    }

    /// Re-submit queued reports oldest first, stopping at the first failure.
    pub async fn flush_pending(&self, ctx: &CallContext) -> FlushSummary {
        let _flushing = self.flush_lock.lock().await;
        let mut summary = FlushSummary { delivered: 0, dropped: 0, remaining: 0 };

        loop {
            let next = self.queue().front().cloned();
            let Some(entry) = next else {
                break;
            };

            match self.execute(&Operation::ReportProgress(entry.report.clone()), ctx).await {
                Ok(Fetched::Found(_)) => summary.delivered += 1,
                Ok(Fetched::NotFound) => {
                    tracing::warn!(task_id = %entry.report.task_id, "Dropping queued report for unknown task");
                    summary.dropped += 1;
                }
                Err(e) => {
                    tracing::warn!(task_id = %entry.report.task_id, error = %e, "Flush stopped");
                    break;
                }
            }

            let depth = {
                let mut queue = self.queue();
                queue.remove(entry.id);
                queue.len()
            };
            metrics::set_pending_reports(depth);
        }

        summary.remaining = self.pending_len();
        summary
    }
}
