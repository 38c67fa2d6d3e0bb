use chrono::{DateTime, Utc};
use leadflow_core::{TransitionOutcome, WorkflowExecution, WorkflowStatus, WorkflowSummary};
use rusqlite::{params, Connection, OptionalExtension as _, TransactionBehavior};

use super::{get_conn, parse_enum, parse_json, parse_ts, to_rfc3339, Storage};
use crate::error::StorageError;

fn row_to_execution(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowExecution> {
    let output: Option<String> = row.get(4)?;
    let completed_at: Option<String> = row.get(6)?;
    Ok(WorkflowExecution {
        execution_id: row.get(0)?,
        workflow_name: row.get(1)?,
        status: parse_enum(2, &row.get::<_, String>(2)?)?,
        error_message: row.get(3)?,
        output_data: output.map(|o| parse_json(4, &o)).transpose()?,
        started_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        completed_at: completed_at.map(|c| parse_ts(6, &c)).transpose()?,
    })
}

fn select_execution(conn: &Connection, execution_id: &str) -> rusqlite::Result<Option<WorkflowExecution>> {
    conn.query_row(
        "SELECT execution_id, workflow_name, status, error_message, output_data, started_at, completed_at
           FROM workflow_executions WHERE execution_id = ?1",
        params![execution_id],
        row_to_execution,
    )
    .optional()
}

impl Storage {
    /// Create a `pending` execution unless one already exists.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn begin_execution(
        &self,
        execution_id: &str,
        workflow_name: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO workflow_executions (execution_id, workflow_name, status, started_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(execution_id) DO NOTHING",
            params![execution_id, workflow_name, WorkflowStatus::Pending.as_str(), to_rfc3339(now)],
        )?;
        let execution = select_execution(&tx, execution_id)?.ok_or_else(|| {
            StorageError::NotFound { entity: "workflow_execution", id: execution_id.to_owned() }
        })?;
        tx.commit()?;
        Ok(execution)
    }

    /// Conditional status update; only forward moves are written.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` for an unknown execution.
    pub fn transition_execution(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        output: Option<&WorkflowSummary>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StorageError> {
        let output = output.map(serde_json::to_string).transpose()?;
        let completed_at = next.is_terminal().then(|| to_rfc3339(now));

        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // At most two predecessors exist; pad to a fixed placeholder count.
        let allowed = WorkflowStatus::predecessors(next);
        let updated = match allowed {
            [] => 0,
            [first, rest @ ..] => {
                let second = rest.first().unwrap_or(first);
                tx.execute(
                    "UPDATE workflow_executions SET
                       status = ?2,
                       error_message = COALESCE(?3, error_message),
                       output_data = COALESCE(?4, output_data),
                       completed_at = COALESCE(?5, completed_at)
                     WHERE execution_id = ?1 AND status IN (?6, ?7)",
                    params![
                        execution_id,
                        next.as_str(),
                        error_message,
                        output,
                        completed_at,
                        first.as_str(),
                        second.as_str(),
                    ],
                )?
            },
        };

        let current = select_execution(&tx, execution_id)?.ok_or_else(|| {
            StorageError::NotFound { entity: "workflow_execution", id: execution_id.to_owned() }
        })?;
        tx.commit()?;

        if updated == 0 {
            tracing::debug!(
                execution_id,
                current = current.status.as_str(),
                requested = next.as_str(),
                "Workflow transition rejected"
            );
            return Ok(TransitionOutcome::Rejected { current: current.status });
        }
        Ok(TransitionOutcome::Applied(current))
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_execution(&self, execution_id: &str) -> Result<Option<WorkflowExecution>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(select_execution(&conn, execution_id)?)
    }
}
