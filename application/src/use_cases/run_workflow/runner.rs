//! One Tokio task per workflow run.

use super::{RunWorkflowError, RunWorkflowInput, RunWorkflowUseCase};
use crate::ports::workflow_progress::{NoWorkflowProgress, WorkflowProgressNotifier};
use std::sync::Arc;
use stepwise_domain::WorkflowResult;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns independent runs that share the use case (and so the catalog).
///
/// Every run gets a child of the runner's token: cancelling the runner
/// cancels all runs, cancelling a handle cancels only that run.
pub struct WorkflowRunner {
    use_case: RunWorkflowUseCase,
    progress: Arc<dyn WorkflowProgressNotifier>,
    shutdown: CancellationToken,
}

impl WorkflowRunner {
    pub fn new(use_case: RunWorkflowUseCase) -> Self {
        Self {
            use_case,
            progress: Arc::new(NoWorkflowProgress),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn WorkflowProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    /// Token that cancels every run spawned from this runner
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn(&self, input: RunWorkflowInput) -> WorkflowHandle {
        let token = self.shutdown.child_token();
        let use_case = self.use_case.clone().with_cancellation(token.clone());
        let progress = self.progress.clone();

        let task = tokio::spawn(async move {
            use_case
                .execute_with_progress(input, progress.as_ref())
                .await
        });
        WorkflowHandle { token, task }
    }
}

pub struct WorkflowHandle {
    token: CancellationToken,
    task: JoinHandle<Result<WorkflowResult, RunWorkflowError>>,
}

impl WorkflowHandle {
    /// Request cancellation; the run ends in `FAILED` with `Cancelled`
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<WorkflowResult, RunWorkflowError> {
        self.task
            .await
            .map_err(|e| RunWorkflowError::TaskFailed(e.to_string()))?
    }
}
