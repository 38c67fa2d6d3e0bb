use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadflow_core::{TransitionOutcome, WorkflowExecution, WorkflowStatus, WorkflowSummary};

use crate::error::StorageError;

/// Workflow execution tracking.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Create the execution in `pending` if unknown; return the current row either way.
    async fn begin_execution(
        &self,
        execution_id: &str,
        workflow_name: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, StorageError>;

    /// Move the execution to `next` if it is currently in one of
    /// `WorkflowStatus::predecessors(next)`; otherwise report `Rejected`.
    ///
    /// Terminal states record `completed_at`, the error message and the summary.
    async fn transition_execution(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        output: Option<&WorkflowSummary>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StorageError>;

    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<WorkflowExecution>, StorageError>;
}
