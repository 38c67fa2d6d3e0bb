//! External orchestration runs and their one-directional status machine.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `pending → processing → {success, failed}`; terminal states are final.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
}

impl WorkflowStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a forward step.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (*self, next) {
            (Self::Pending, Self::Processing | Self::Success | Self::Failed) => true,
            (Self::Processing, Self::Success | Self::Failed) => true,
            _ => false,
        }
    }

    /// States from which a transition into `next` is allowed.
    #[must_use]
    pub fn predecessors(next: Self) -> &'static [Self] {
        match next {
            Self::Pending => &[],
            Self::Processing => &[Self::Pending],
            Self::Success | Self::Failed => &[Self::Pending, Self::Processing],
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "queued" => Ok(Self::Pending),
            "processing" | "running" | "started" => Ok(Self::Processing),
            "success" | "succeeded" | "completed" => Ok(Self::Success),
            "failed" | "failure" | "error" => Ok(Self::Failed),
            _ => Err(CoreError::invalid("workflow status", s)),
        }
    }
}

/// One run of an external orchestration, keyed by `execution_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub error_message: Option<String>,
    pub output_data: Option<WorkflowSummary>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Snapshot of the work performed by one reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub lead_id: Option<String>,
    pub lead_created: bool,
    pub lead_updated: bool,
    pub conversation_id: Option<String>,
    pub conversation_created: bool,
    pub extraction_upserted: bool,
    pub profile_upserted: bool,
}

/// Result of requesting a status change.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(WorkflowExecution),
    /// The execution was already past the requested state; nothing changed.
    Rejected { current: WorkflowStatus },
}

impl TransitionOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(WorkflowStatus::Pending.can_transition_to(WorkflowStatus::Processing));
        assert!(WorkflowStatus::Pending.can_transition_to(WorkflowStatus::Success));
        assert!(WorkflowStatus::Processing.can_transition_to(WorkflowStatus::Failed));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [WorkflowStatus::Success, WorkflowStatus::Failed] {
            for next in [
                WorkflowStatus::Pending,
                WorkflowStatus::Processing,
                WorkflowStatus::Success,
                WorkflowStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn no_regression_to_pending() {
        assert!(!WorkflowStatus::Processing.can_transition_to(WorkflowStatus::Pending));
        assert!(WorkflowStatus::predecessors(WorkflowStatus::Pending).is_empty());
    }

    #[test]
    fn parses_orchestrator_synonyms() {
        assert_eq!("Succeeded".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Success));
        assert_eq!("running".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Processing));
        assert!("paused".parse::<WorkflowStatus>().is_err());
    }
}
