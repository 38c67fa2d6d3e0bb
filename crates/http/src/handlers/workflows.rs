use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use leadflow_core::WorkflowExecution;

use crate::api_error::ApiError;
use crate::AppState;

/// The record an orchestrator polls to decide whether to retry.
pub async fn get_workflow_execution(
    State(state): State<Arc<AppState>>,
    Path(execution_id): Path<String>,
) -> Result<Json<WorkflowExecution>, ApiError> {
    state
        .coordinator
        .tracker()
        .get(&execution_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("workflow execution '{execution_id}' not found")))
}
