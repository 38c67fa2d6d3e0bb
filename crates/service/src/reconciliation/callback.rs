use chrono::Utc;
use leadflow_core::{ConversationInput, Lead, LeadFacts, ProfileInput, WorkflowStatus};
use leadflow_storage::traits::{ExtractionStore, LeadStore};

use super::voice::status_after;
use super::{
    note_lead, CallbackInput, ExecutionRef, ReconciliationCoordinator, ReconciliationReport,
};
use crate::ServiceError;

impl ReconciliationCoordinator {
    /// Workflow automation callback.
    ///
    /// Invalid fragments do not fail the request: the execution is marked
    /// failed and the report carries the error. Persistence errors propagate.
    pub async fn handle_callback(
        &self,
        input: CallbackInput,
    ) -> Result<ReconciliationReport, ServiceError> {
        let CallbackInput {
            execution,
            reported_status,
            reported_error,
            lead_id,
            facts,
            conversation,
            profile,
        } = input;

        self.tracker.start(&execution.execution_id, &execution.workflow_name).await?;

        let mut report = ReconciliationReport::default();
        let result =
            self.apply_callback(lead_id, facts, conversation, profile, &mut report).await;

        match result {
            Ok(()) => {},
            Err(e) if e.is_validation() => {
                return self.record_rejection(&execution, e.to_string(), report).await;
            },
            Err(e) => {
                self.report_failure(&execution, &e, &report.summary).await;
                return Err(e);
            },
        }

        let outcome = match reported_status {
            WorkflowStatus::Success => {
                Some(self.tracker.succeed(&execution.execution_id, &report.summary).await?)
            },
            WorkflowStatus::Failed => {
                let message =
                    reported_error.unwrap_or_else(|| "workflow reported failure".to_owned());
                Some(
                    self.tracker
                        .fail(&execution.execution_id, &message, Some(&report.summary))
                        .await?,
                )
            },
            WorkflowStatus::Pending | WorkflowStatus::Processing => None,
        };
        report.workflow_status = Some(
            outcome.map_or(WorkflowStatus::Processing, |o| status_after(&o, reported_status)),
        );
        Ok(report)
    }

    /// Callback whose payload could not be interpreted at all. The named
    /// execution is still recorded, and marked failed with `message`.
    pub async fn reject_callback(
        &self,
        execution: &ExecutionRef,
        message: String,
    ) -> Result<ReconciliationReport, ServiceError> {
        self.tracker.start(&execution.execution_id, &execution.workflow_name).await?;
        self.record_rejection(execution, message, ReconciliationReport::default()).await
    }

    async fn record_rejection(
        &self,
        execution: &ExecutionRef,
        message: String,
        mut report: ReconciliationReport,
    ) -> Result<ReconciliationReport, ServiceError> {
        tracing::warn!(
            error = %message,
            execution_id = %execution.execution_id,
            "Rejected workflow callback payload"
        );
        let outcome =
            self.tracker.fail(&execution.execution_id, &message, Some(&report.summary)).await?;
        report.workflow_status = Some(status_after(&outcome, WorkflowStatus::Failed));
        report.error = Some(message);
        Ok(report)
    }

    async fn apply_callback(
        &self,
        lead_id: Option<String>,
        facts: Option<LeadFacts>,
        conversation: Option<ConversationInput>,
        profile: Option<ProfileInput>,
        report: &mut ReconciliationReport,
    ) -> Result<(), ServiceError> {
        let identified = lead_id.is_some() || facts.as_ref().is_some_and(|f| !f.is_anonymous());
        if profile.is_some() && !(identified && conversation.is_some()) {
            return Err(ServiceError::Validation(
                "profile fragment needs both a lead and a conversation".to_owned(),
            ));
        }

        let lead = match (facts, lead_id) {
            (Some(facts), _) if !facts.is_anonymous() => {
                let resolved = self.resolver.resolve(&facts).await?;
                note_lead(&mut report.summary, &resolved);
                Some(resolved.lead)
            },
            (_, Some(id)) => Some(self.known_lead(&id).await?),
            _ => None,
        };

        let mut owner = lead.as_ref().map(|l| l.id.clone());
        let conversation_id = match conversation {
            Some(input) => {
                let id = self.open_conversation(input, &mut report.summary).await?;
                if let Some(ref lead) = lead {
                    owner = Some(self.link(&id, lead).await?);
                }
                Some(id)
            },
            None => None,
        };
        report.summary.lead_id = owner.clone();

        let Some(profile) = profile else {
            return Ok(());
        };
        let (Some(lead_id), Some(conversation_id)) = (owner, conversation_id) else {
            return Err(ServiceError::Validation(
                "profile fragment needs both a lead and a conversation".to_owned(),
            ));
        };
        let profile = profile.into_profile(
            &lead_id,
            &conversation_id,
            self.extractor.version(),
            Utc::now(),
        );
        self.storage.upsert_profile(&profile).await?;
        report.summary.profile_upserted = true;
        tracing::info!(lead_id = %lead_id, conversation_id = %conversation_id, "Upserted AI profile from callback");
        Ok(())
    }

    async fn known_lead(&self, id: &str) -> Result<Lead, ServiceError> {
        self.storage
            .get_lead(id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("unknown lead id {id}")))
    }
}
