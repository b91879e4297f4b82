//! Shared utilities for use cases.
//!
//! Cancellation checking and the bounded-call helper that puts a timeout and
//! the caller's cancellation token around every oracle and tool call.

use std::future::Future;
use std::time::Duration;
use stepwise_domain::WorkflowError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), WorkflowError> {
    if token.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }
    Ok(())
}

/// Outcome of a call raced against its timeout and the cancellation token.
#[derive(Debug)]
pub(crate) enum Bounded<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

/// Run `fut` until it completes, `timeout` elapses or `cancel` fires.
///
/// The losing future is dropped, which aborts an in-flight request.
pub(crate) async fn run_bounded<F>(
    fut: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Bounded<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Bounded::Cancelled,
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(value) => Bounded::Completed(value),
            Err(_) => Bounded::TimedOut,
        },
    }
}
