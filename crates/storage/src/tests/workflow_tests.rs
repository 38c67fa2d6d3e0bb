#![allow(clippy::unwrap_used, reason = "test code")]

use chrono::Utc;
use leadflow_core::{TransitionOutcome, WorkflowStatus, WorkflowSummary};

use super::create_test_storage;
use crate::StorageError;

#[test]
fn begin_execution_is_idempotent() {
    let (storage, _dir) = create_test_storage();
    let first = storage.begin_execution("exec-1", "post-call", Utc::now()).unwrap();
    assert_eq!(first.status, WorkflowStatus::Pending);

    storage
        .transition_execution("exec-1", WorkflowStatus::Processing, None, None, Utc::now())
        .unwrap();
    let again = storage.begin_execution("exec-1", "post-call", Utc::now()).unwrap();
    assert_eq!(again.status, WorkflowStatus::Processing);
}

#[test]
fn forward_transitions_apply_and_terminal_state_is_final() {
    let (storage, _dir) = create_test_storage();
    storage.begin_execution("exec-1", "post-call", Utc::now()).unwrap();

    let processing = storage
        .transition_execution("exec-1", WorkflowStatus::Processing, None, None, Utc::now())
        .unwrap();
    assert!(processing.is_applied());

    let summary = WorkflowSummary {
        lead_id: Some("lead-1".to_owned()),
        lead_created: true,
        ..WorkflowSummary::default()
    };
    let success = storage
        .transition_execution("exec-1", WorkflowStatus::Success, None, Some(&summary), Utc::now())
        .unwrap();
    let TransitionOutcome::Applied(execution) = success else {
        panic!("expected success to apply");
    };
    assert!(execution.completed_at.is_some());
    assert_eq!(execution.output_data, Some(summary));

    let late_failure = storage
        .transition_execution("exec-1", WorkflowStatus::Failed, Some("boom"), None, Utc::now())
        .unwrap();
    assert_eq!(late_failure, TransitionOutcome::Rejected { current: WorkflowStatus::Success });

    let stored = storage.get_execution("exec-1").unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Success);
    assert!(stored.error_message.is_none());
}

#[test]
fn repeated_processing_is_rejected() {
    let (storage, _dir) = create_test_storage();
    storage.begin_execution("exec-1", "post-call", Utc::now()).unwrap();
    storage
        .transition_execution("exec-1", WorkflowStatus::Processing, None, None, Utc::now())
        .unwrap();
    let again = storage
        .transition_execution("exec-1", WorkflowStatus::Processing, None, None, Utc::now())
        .unwrap();
    assert_eq!(again, TransitionOutcome::Rejected { current: WorkflowStatus::Processing });
}

#[test]
fn failure_from_pending_records_error() {
    let (storage, _dir) = create_test_storage();
    storage.begin_execution("exec-1", "post-call", Utc::now()).unwrap();
    let outcome = storage
        .transition_execution("exec-1", WorkflowStatus::Failed, Some("LLM down"), None, Utc::now())
        .unwrap();
    let TransitionOutcome::Applied(execution) = outcome else {
        panic!("expected failure to apply");
    };
    assert_eq!(execution.error_message.as_deref(), Some("LLM down"));
}

#[test]
fn transition_of_unknown_execution_is_not_found() {
    let (storage, _dir) = create_test_storage();
    let err = storage
        .transition_execution("missing", WorkflowStatus::Success, None, None, Utc::now())
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}
