//! Timeout enforcement.
//!
//! Every outbound call runs under a deadline and a cancellation token. The
//! three ways a bounded call can end are kept distinct so callers can map a
//! timeout to "try the next tier" and a cancellation to "stop everything".

use std::future::Future;
use std::time::Duration;

use crate::resilience::cancel::CancelToken;

/// How a bounded call ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Bounded<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

/// Run `fut` until it completes, `budget` elapses, or `cancel` fires.
///
/// The future is dropped on timeout or cancellation, which aborts any I/O it
/// has in flight.
pub async fn bounded<F>(budget: Option<Duration>, cancel: &CancelToken, fut: F) -> Bounded<F::Output>
where
    F: Future,
{
    if cancel.is_cancelled() {
        return Bounded::Cancelled;
    }

    let deadline = async {
        match budget {
            Some(budget) => tokio::time::sleep(budget).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Bounded::Cancelled,
        output = fut => Bounded::Completed(output),
        _ = deadline => Bounded::TimedOut,
    }
}

/// Sleep for `delay` unless cancelled first. Returns `false` when cancelled.
pub async fn sleep_unless_cancelled(delay: Duration, cancel: &CancelToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
