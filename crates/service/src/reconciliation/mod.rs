//! Orchestrates identity resolution, conversation linking, extraction and
//! profile writes for each inbound event, then reports the outcome to the
//! workflow status tracker.
//!
//! Ordering: the lead/conversation link is written before anything that
//! references it, and the workflow status update is always the last write.

mod callback;
mod voice;


use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{
    ConversationInput, ExtractionStatus, Lead, LeadFacts, PipelineSettings, ProfileInput,
    WorkflowStatus, WorkflowSummary,
};
use leadflow_llm::TranscriptExtractor;
use leadflow_storage::traits::{ConversationStore, LeadStore};
use leadflow_storage::{StorageBackend, StorageError};

use crate::identity::{IdentityResolver, ResolveAction, ResolvedLead};
use crate::workflow_tracker::WorkflowTracker;
use crate::ServiceError;

/// External orchestration run an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRef {
    pub execution_id: String,
    pub workflow_name: String,
}

/// A finished call with (possibly empty) transcript.
#[derive(Debug, Clone)]
pub struct PostCallInput {
    /// Caller identity as reported by the voice processor.
    pub caller: LeadFacts,
    pub conversation: ConversationInput,
    pub execution: Option<ExecutionRef>,
}

/// Callback from the workflow automation with pre-computed fragments.
#[derive(Debug, Clone)]
pub struct CallbackInput {
    pub execution: ExecutionRef,
    /// Status the orchestrator reports for its own run.
    pub reported_status: WorkflowStatus,
    pub reported_error: Option<String>,
    pub lead_id: Option<String>,
    pub facts: Option<LeadFacts>,
    pub conversation: Option<ConversationInput>,
    pub profile: Option<ProfileInput>,
}

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub summary: WorkflowSummary,
    pub extraction_status: Option<ExtractionStatus>,
    /// Workflow status after the run, when an execution was attached.
    pub workflow_status: Option<WorkflowStatus>,
    /// Set when the run was rejected as invalid but still reported.
    pub error: Option<String>,
}

pub struct ReconciliationCoordinator {
    storage: Arc<StorageBackend>,
    resolver: IdentityResolver,
    tracker: WorkflowTracker,
    extractor: Arc<dyn TranscriptExtractor>,
    settings: PipelineSettings,
}

impl ReconciliationCoordinator {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        extractor: Arc<dyn TranscriptExtractor>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(Arc::clone(&storage)),
            tracker: WorkflowTracker::new(Arc::clone(&storage)),
            storage,
            extractor,
            settings,
        }
    }

    #[must_use]
    pub const fn tracker(&self) -> &WorkflowTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// CRM contact created/updated: identity only.
    pub async fn reconcile_contact(&self, facts: &LeadFacts) -> Result<ResolvedLead, ServiceError> {
        self.resolver.resolve(facts).await
    }

    /// Voice `call_started`: resolve the caller and open the conversation.
    pub async fn record_call_started(
        &self,
        caller: &LeadFacts,
        conversation: ConversationInput,
    ) -> Result<ReconciliationReport, ServiceError> {
        let mut summary = WorkflowSummary::default();
        let resolved = self.resolver.resolve(caller).await?;
        note_lead(&mut summary, &resolved);
        let conversation_id = self.open_conversation(conversation, &mut summary).await?;
        self.link(&conversation_id, &resolved.lead).await?;
        Ok(ReconciliationReport { summary, ..ReconciliationReport::default() })
    }

    /// Upsert the conversation by `external_call_id`, recording the outcome.
    async fn open_conversation(
        &self,
        input: ConversationInput,
        summary: &mut WorkflowSummary,
    ) -> Result<String, ServiceError> {
        if input.external_call_id.trim().is_empty() {
            return Err(ServiceError::Validation("conversation has no external call id".to_owned()));
        }
        let candidate = input.into_conversation(uuid::Uuid::new_v4().to_string(), Utc::now());
        let upsert = self.storage.upsert_conversation(&candidate).await?;
        summary.conversation_id = Some(upsert.conversation.id.clone());
        summary.conversation_created = upsert.created;
        Ok(upsert.conversation.id)
    }

    /// Attach the conversation to `lead`, returning the owning lead id.
    ///
    /// A conversation keeps the first lead it was linked to.
    async fn link(&self, conversation_id: &str, lead: &Lead) -> Result<String, ServiceError> {
        let owner = self
            .storage
            .link_conversation(conversation_id, &lead.id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "conversation",
                id: conversation_id.to_owned(),
            })?;
        if owner != lead.id {
            tracing::warn!(
                conversation_id,
                owner = %owner,
                resolved = %lead.id,
                "Conversation already belongs to another lead, keeping original owner"
            );
        }
        Ok(owner)
    }

    /// The lead record for `owner_id`, reusing `resolved` when it is the owner.
    async fn owning_lead(&self, owner_id: &str, resolved: Lead) -> Result<Lead, ServiceError> {
        if resolved.id == owner_id {
            return Ok(resolved);
        }
        Ok(self
            .storage
            .get_lead(owner_id)
            .await?
            .ok_or_else(|| StorageError::NotFound { entity: "lead", id: owner_id.to_owned() })?)
    }

    /// Mark the execution failed after a critical error. The original error
    /// is what the caller sees; a failure to record it is only logged.
    async fn report_failure(
        &self,
        execution: &ExecutionRef,
        error: &ServiceError,
        summary: &WorkflowSummary,
    ) {
        if let Err(e) =
            self.tracker.fail(&execution.execution_id, &error.to_string(), Some(summary)).await
        {
            tracing::error!(
                error = %e,
                execution_id = %execution.execution_id,
                "Failed to record workflow failure"
            );
        }
    }
}

fn note_lead(summary: &mut WorkflowSummary, resolved: &ResolvedLead) {
    summary.lead_id = Some(resolved.lead.id.clone());
    match resolved.action {
        ResolveAction::Created => summary.lead_created = true,
        ResolveAction::Updated => summary.lead_updated = true,
        ResolveAction::Unchanged => {},
    }
}
