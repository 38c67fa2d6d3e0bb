//! WorkflowStore implementation for PgStorage.

use super::*;

use crate::traits::WorkflowStore;
use async_trait::async_trait;
use leadflow_core::{TransitionOutcome, WorkflowStatus, WorkflowSummary};

#[async_trait]
impl WorkflowStore for PgStorage {
    async fn begin_execution(
        &self,
        execution_id: &str,
        workflow_name: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, StorageError> {
        sqlx::query(
            "INSERT INTO workflow_executions (execution_id, workflow_name, status, started_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (execution_id) DO NOTHING",
        )
        .bind(execution_id)
        .bind(workflow_name)
        .bind(WorkflowStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.get_execution(execution_id).await?.ok_or_else(|| StorageError::NotFound {
            entity: "workflow_execution",
            id: execution_id.to_owned(),
        })
    }

    async fn transition_execution(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        output: Option<&WorkflowSummary>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StorageError> {
        let allowed: Vec<&str> =
            WorkflowStatus::predecessors(next).iter().map(WorkflowStatus::as_str).collect();
        let output = output.map(serde_json::to_value).transpose()?;
        let completed_at = next.is_terminal().then_some(now);

        let row = sqlx::query(&format!(
            "UPDATE workflow_executions SET
               status = $2,
               error_message = COALESCE($3, error_message),
               output_data = COALESCE($4, output_data),
               completed_at = COALESCE($5, completed_at)
             WHERE execution_id = $1 AND status = ANY($6)
             RETURNING {EXECUTION_COLUMNS}"
        ))
        .bind(execution_id)
        .bind(next.as_str())
        .bind(error_message)
        .bind(output)
        .bind(completed_at)
        .bind(allowed)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(TransitionOutcome::Applied(row_to_execution(&row)?));
        }
        let current = self.get_execution(execution_id).await?.ok_or_else(|| {
            StorageError::NotFound { entity: "workflow_execution", id: execution_id.to_owned() }
        })?;
        tracing::debug!(
            execution_id,
            current = current.status.as_str(),
            requested = next.as_str(),
            "Workflow transition rejected"
        );
        Ok(TransitionOutcome::Rejected { current: current.status })
    }

    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<WorkflowExecution>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM workflow_executions WHERE execution_id = $1"
        ))
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_execution(&r)).transpose()
    }
}
