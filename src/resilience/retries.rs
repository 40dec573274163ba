//! Client-side retry engine.
//!
//! # State Machine
//! ```text
//! Idle → Attempting → Succeeded
//!                   → NotFound (terminal, not an error)
//!                   → Failed-Retryable → (backoff) → Attempting
//!                   → Failed-Terminal (non-retryable error or max attempts)
//!        (any state) → Cancelled
//! ```
//!
//! A [`RetrySession`] is built per logical call and consumed by
//! [`RetrySession::run`]. Attempts never overlap. Once cancellation is
//! requested no further attempt starts, no observer hook fires, and the
//! session resolves to [`RetryError::Cancelled`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::schema::RetryConfig;
use crate::resilience::backoff::Backoff;
use crate::resilience::cancel::CancelToken;
use crate::resilience::timeouts::sleep_unless_cancelled;

/// Terminal, successful result of a pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    /// The resource exists and this is its payload.
    Found(T),
    /// The resource is absent. This is an answer, not a fault.
    NotFound,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Found(value) => Fetched::Found(f(value)),
            Fetched::NotFound => Fetched::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Fetched::NotFound)
    }
}

/// Classification hook for the errors a single attempt can produce.
pub trait Retryable {
    /// Whether another attempt could plausibly succeed.
    fn is_retryable(&self) -> bool;

    /// Whether the failure was a deadline being exceeded.
    fn is_timeout(&self) -> bool {
        false
    }
}

/// Observer hooks. All methods default to no-ops.
pub trait RetryObserver: Send + Sync {
    /// A retryable failure was recorded. `next_delay` is `None` when no
    /// further attempt will be made.
    fn on_retry(&self, _failures: u32, _error: &dyn fmt::Display, _next_delay: Option<Duration>) {}

    /// Consecutive failures reached the warning threshold. Fires at most once.
    fn on_warn(&self, _failures: u32) {}

    /// The attempt budget is spent.
    fn on_exhausted(&self, _attempts: u32, _error: &dyn fmt::Display) {}
}

/// Observer that ignores every hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}

/// Observer that logs every hook through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self { operation: operation.into() }
    }
}

impl RetryObserver for TracingObserver {
    fn on_retry(&self, failures: u32, error: &dyn fmt::Display, next_delay: Option<Duration>) {
        tracing::warn!(
            operation = %self.operation,
            failures,
            next_delay = ?next_delay,
            error = %error,
            "Attempt failed"
        );
    }

    fn on_warn(&self, failures: u32) {
        tracing::warn!(operation = %self.operation, failures, "Request appears stuck");
    }

    fn on_exhausted(&self, attempts: u32, error: &dyn fmt::Display) {
        tracing::error!(
            operation = %self.operation,
            attempts,
            error = %error,
            "Giving up after all retry attempts"
        );
    }
}

/// Retry tuning for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Consecutive failures after which the session is flagged as stuck.
    pub warn_after: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            warn_after: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            warn_after: config.warn_after,
            backoff: Backoff::from_config(config),
        }
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Success,
    Failure,
    Timeout,
    Cancelled,
}

/// Bookkeeping for one attempt.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    /// 1-based attempt number.
    pub sequence: u32,
    pub started_at: Instant,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Attempting,
    Backoff,
    Succeeded,
    Failed,
    Cancelled,
}

/// Terminal failure of a session.
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Display> {
    /// Every allowed attempt failed.
    #[error("gave up after {} attempts: {last_error}", .attempts.len())]
    Exhausted {
        attempts: Vec<RequestAttempt>,
        last_error: E,
    },

    /// An attempt failed in a way retrying cannot fix.
    #[error("{error}")]
    Rejected {
        attempts: Vec<RequestAttempt>,
        error: E,
    },

    /// The caller cancelled the session.
    #[error("cancelled after {} attempts", .attempts.len())]
    Cancelled { attempts: Vec<RequestAttempt> },
}

impl<E: fmt::Display> RetryError<E> {
    pub fn attempts(&self) -> &[RequestAttempt] {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Rejected { attempts, .. }
            | RetryError::Cancelled { attempts } => attempts,
        }
    }

    /// The error of the final attempt, if it ended in one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::Rejected { error, .. } => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// Retry bookkeeping for one logical call.
pub struct RetrySession {
    policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
    cancel: CancelToken,
    attempts: Vec<RequestAttempt>,
    stuck: bool,
    state: SessionState,
}

impl fmt::Debug for RetrySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySession")
            .field("policy", &self.policy)
            .field("attempts", &self.attempts.len())
            .field("stuck", &self.stuck)
            .field("state", &self.state)
            .finish()
    }
}

impl RetrySession {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: Arc::new(NoopObserver),
            cancel: CancelToken::new(),
            attempts: Vec::new(),
            stuck: false,
            state: SessionState::Idle,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Tie the session to an existing token, e.g. one shared with a UI.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle the caller can use to cancel the session while it runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive `op` until it resolves, the budget is spent, or the session is
    /// cancelled. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(mut self, mut op: F) -> Result<Fetched<T>, RetryError<E>>
    where
        E: Retryable + fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Fetched<T>, E>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            let sequence = self.attempts.len() as u32 + 1;
            self.attempts.push(RequestAttempt {
                sequence,
                started_at: Instant::now(),
                outcome: AttemptOutcome::Pending,
                error: None,
            });
            self.state = SessionState::Attempting;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = op(sequence) => Some(result),
            };

            // A result that raced with cancellation is discarded.
            let result = match result {
                Some(result) if !self.cancel.is_cancelled() => result,
                _ => return Err(self.cancelled()),
            };

            let error = match result {
                Ok(fetched) => {
                    self.finish_attempt(AttemptOutcome::Success, None);
                    self.state = SessionState::Succeeded;
                    return Ok(fetched);
                }
                Err(error) => error,
            };

            let outcome = if error.is_timeout() {
                AttemptOutcome::Timeout
            } else {
                AttemptOutcome::Failure
            };
            self.finish_attempt(outcome, Some(error.to_string()));

            if !error.is_retryable() {
                self.state = SessionState::Failed;
                return Err(RetryError::Rejected {
                    attempts: self.attempts,
                    error,
                });
            }

            failures += 1;
            let exhausted = failures >= max_attempts;
            let next_delay = if exhausted {
                None
            } else {
                Some(self.policy.backoff.delay(failures - 1))
            };

            self.observer.on_retry(failures, &error, next_delay);

            if failures >= self.policy.warn_after && !self.stuck {
                self.stuck = true;
                self.observer.on_warn(failures);
            }

            let Some(delay) = next_delay else {
                self.state = SessionState::Failed;
                self.observer.on_exhausted(failures, &error);
                return Err(RetryError::Exhausted {
                    attempts: self.attempts,
                    last_error: error,
                });
            };

            self.state = SessionState::Backoff;
            if !sleep_unless_cancelled(delay, &self.cancel).await {
                return Err(self.cancelled());
            }
        }
    }

    fn finish_attempt(&mut self, outcome: AttemptOutcome, error: Option<String>) {
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.outcome = outcome;
            attempt.error = error;
        }
    }

    fn cancelled<E: fmt::Display>(&mut self) -> RetryError<E> {
        if let Some(attempt) = self.attempts.last_mut() {
            if attempt.outcome == AttemptOutcome::Pending {
                attempt.outcome = AttemptOutcome::Cancelled;
            }
        }
        self.state = SessionState::Cancelled;
        RetryError::Cancelled {
            attempts: std::mem::take(&mut self.attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Network,
        Timeout,
        Auth,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Auth)
        }

        fn is_timeout(&self) -> bool {
            matches!(self, TestError::Timeout)
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        retries: AtomicU32,
        warnings: AtomicU32,
        exhausted: AtomicU32,
        delays: Mutex<Vec<Option<Duration>>>,
    }

    impl RetryObserver for CountingObserver {
        fn on_retry(&self, _failures: u32, _error: &dyn fmt::Display, next_delay: Option<Duration>) {
            self.retries.fetch_add(1, Ordering::SeqCst);
            self.delays.lock().unwrap().push(next_delay);
        }

        fn on_warn(&self, _failures: u32) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }

        fn on_exhausted(&self, _attempts: u32, _error: &dyn fmt::Display) {
            self.exhausted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn policy(max_attempts: u32, warn_after: u32, initial_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            warn_after,
            backoff: Backoff::new(
                Duration::from_millis(initial_ms),
                2.0,
                Duration::from_secs(16),
            ),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let observer = Arc::new(CountingObserver::default());
        let session = RetrySession::new(policy(3, 3, 100)).with_observer(observer.clone());
        let calls = AtomicU32::new(0);

        let start = tokio::time::Instant::now();
        let result = session
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Network)
                    } else {
                        Ok(Fetched::Found(serde_json::json!({"ok": true})))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), Fetched::Found(serde_json::json!({"ok": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.retries.load(Ordering::SeqCst), 2);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(310));
        assert_eq!(
            *observer.delays.lock().unwrap(),
            vec![Some(Duration::from_millis(100)), Some(Duration::from_millis(200))]
        );
        assert_eq!(observer.exhausted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let observer = Arc::new(CountingObserver::default());
        let session = RetrySession::new(policy(5, 3, 10)).with_observer(observer.clone());
        let calls = AtomicU32::new(0);

        let result: Result<Fetched<()>, _> = session
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Timeout) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { .. }));
        assert_eq!(err.attempts().len(), 5);
        assert!(err.attempts().iter().all(|a| a.outcome == AttemptOutcome::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(observer.warnings.load(Ordering::SeqCst), 1);
        assert_eq!(observer.exhausted.load(Ordering::SeqCst), 1);
        assert_eq!(observer.delays.lock().unwrap().last(), Some(&None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_terminal() {
        let observer = Arc::new(CountingObserver::default());
        let session = RetrySession::new(policy(5, 3, 10)).with_observer(observer.clone());
        let calls = AtomicU32::new(0);

        let result: Result<Fetched<()>, RetryError<TestError>> = session
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Fetched::NotFound) }
            })
            .await;

        assert_eq!(result.unwrap(), Fetched::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observer.retries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_error_not_retried() {
        let observer = Arc::new(CountingObserver::default());
        let session = RetrySession::new(policy(5, 1, 10)).with_observer(observer.clone());
        let calls = AtomicU32::new(0);

        let result: Result<Fetched<()>, _> = session
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Auth) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Rejected { error: TestError::Auth, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observer.retries.load(Ordering::SeqCst), 0);
        assert_eq!(observer.warnings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_attempts() {
        let observer = Arc::new(CountingObserver::default());
        let session = RetrySession::new(policy(5, 10, 1_000)).with_observer(observer.clone());
        let token = session.cancel_token();
        let calls = Arc::new(AtomicU32::new(0));

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                token.cancel();
            }
        });

        let counter = calls.clone();
        let result = session
            .run(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TestError::Network)
                    } else {
                        Ok(Fetched::Found(()))
                    }
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observer.exhausted.load(Ordering::SeqCst), 0);
        assert_eq!(observer.retries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_attempt() {
        let session = RetrySession::new(policy(5, 3, 10));
        let token = session.cancel_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
            token.cancel();
        });

        let result: Result<Fetched<()>, RetryError<TestError>> = session
            .run(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Fetched::Found(()))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts().len(), 1);
        assert_eq!(err.attempts()[0].outcome, AttemptOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let session = RetrySession::new(RetryPolicy::default());
        session.cancel_token().cancel();

        let result: Result<Fetched<()>, RetryError<TestError>> =
            session.run(|_| async { Ok(Fetched::Found(())) }).await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { .. }));
        assert!(err.attempts().is_empty());
    }

    #[test]
    fn test_fetched_helpers() {
        assert_eq!(Fetched::Found(2).map(|v| v * 2).found(), Some(4));
        assert!(Fetched::<u8>::NotFound.is_not_found());
    }
}
