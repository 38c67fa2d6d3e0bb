use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{TransitionOutcome, WorkflowExecution, WorkflowStatus, WorkflowSummary};
use leadflow_storage::traits::WorkflowStore;
use leadflow_storage::StorageBackend;

use crate::ServiceError;

/// Status record of external orchestration runs.
///
/// Transitions are monotonic. A late update against a terminal execution is
/// rejected by the store and reported here as `TransitionOutcome::Rejected`,
/// which callers treat as a no-op.
pub struct WorkflowTracker {
    storage: Arc<StorageBackend>,
}

impl WorkflowTracker {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Register the execution (idempotent) and move it to `processing`.
    pub async fn start(
        &self,
        execution_id: &str,
        workflow_name: &str,
    ) -> Result<WorkflowExecution, ServiceError> {
        let execution = self.storage.begin_execution(execution_id, workflow_name, Utc::now()).await?;
        match self.transition(execution_id, WorkflowStatus::Processing, None, None).await? {
            TransitionOutcome::Applied(updated) => Ok(updated),
            TransitionOutcome::Rejected { .. } => Ok(execution),
        }
    }

    pub async fn succeed(
        &self,
        execution_id: &str,
        summary: &WorkflowSummary,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(execution_id, WorkflowStatus::Success, None, Some(summary)).await
    }

    pub async fn fail(
        &self,
        execution_id: &str,
        error_message: &str,
        summary: Option<&WorkflowSummary>,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(execution_id, WorkflowStatus::Failed, Some(error_message), summary).await
    }

    pub async fn get(&self, execution_id: &str) -> Result<Option<WorkflowExecution>, ServiceError> {
        Ok(self.storage.get_execution(execution_id).await?)
    }

    async fn transition(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        summary: Option<&WorkflowSummary>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let outcome = self
            .storage
            .transition_execution(execution_id, next, error_message, summary, Utc::now())
            .await?;
        match &outcome {
            TransitionOutcome::Applied(execution) => {
                tracing::info!(
                    execution_id,
                    status = execution.status.as_str(),
                    "Workflow execution updated"
                );
            },
            TransitionOutcome::Rejected { current } => {
                tracing::info!(
                    execution_id,
                    current = current.as_str(),
                    requested = next.as_str(),
                    "Ignoring workflow status update"
                );
            },
        }
        Ok(outcome)
    }
}
