//! Response types (Serialize)

use serde::Serialize;

use leadflow_core::{EventRecord, ExtractionStatus, WorkflowStatus, WorkflowSummary};
use leadflow_service::{ReconciliationReport, ResolveAction, ResolvedLead};

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

/// How the event log treated the delivery.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventLogStatus {
    Recorded,
    Duplicate,
    /// The audit write failed; processing continued.
    Unlogged,
}

impl From<Option<EventRecord>> for EventLogStatus {
    fn from(record: Option<EventRecord>) -> Self {
        match record {
            Some(EventRecord::Recorded) => Self::Recorded,
            Some(EventRecord::Duplicate) => Self::Duplicate,
            None => Self::Unlogged,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadAction {
    Created,
    Updated,
    Unchanged,
}

impl From<ResolveAction> for LeadAction {
    fn from(action: ResolveAction) -> Self {
        match action {
            ResolveAction::Created => Self::Created,
            ResolveAction::Updated => Self::Updated,
            ResolveAction::Unchanged => Self::Unchanged,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub event: EventLogStatus,
    pub lead_id: String,
    pub lead_action: LeadAction,
    pub conflict_resolved: bool,
}

impl ContactResponse {
    #[must_use]
    pub fn new(event: EventLogStatus, resolved: &ResolvedLead) -> Self {
        Self {
            event,
            lead_id: resolved.lead.id.clone(),
            lead_action: resolved.action.into(),
            conflict_resolved: resolved.conflict_resolved,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    pub event: EventLogStatus,
    #[serde(flatten)]
    pub summary: WorkflowSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_status: Option<ExtractionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_status: Option<WorkflowStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationResponse {
    #[must_use]
    pub fn new(event: EventLogStatus, report: ReconciliationReport) -> Self {
        Self {
            event,
            summary: report.summary,
            extraction_status: report.extraction_status,
            workflow_status: report.workflow_status,
            error: report.error,
        }
    }
}
