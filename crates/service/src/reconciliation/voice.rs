use chrono::Utc;
use leadflow_core::{
    AiProfile, ConversationInput, ExtractedLead, Extraction, ExtractionStatus, Lead, LeadFacts,
    TransitionOutcome, WorkflowStatus, WorkflowSummary,
};
use leadflow_llm::ExtractionOutcome;
use leadflow_storage::traits::{ConversationStore, ExtractionStore};

use super::{note_lead, PostCallInput, ReconciliationCoordinator, ReconciliationReport};
use crate::side_effects::best_effort;
use crate::ServiceError;

impl ReconciliationCoordinator {
    /// Post-call transcription: resolve, link, extract, persist, report.
    pub async fn handle_post_call(
        &self,
        input: PostCallInput,
    ) -> Result<ReconciliationReport, ServiceError> {
        let PostCallInput { caller, conversation, execution } = input;

        if let Some(ref execution) = execution {
            self.tracker.start(&execution.execution_id, &execution.workflow_name).await?;
        }

        let mut report = ReconciliationReport::default();
        let result = self.process_post_call(&caller, conversation, &mut report).await;

        let Some(execution) = execution else {
            return result.map(|()| report);
        };
        match result {
            Ok(()) => {
                let outcome = self.tracker.succeed(&execution.execution_id, &report.summary).await?;
                report.workflow_status = Some(status_after(&outcome, WorkflowStatus::Success));
                Ok(report)
            },
            Err(e) => {
                self.report_failure(&execution, &e, &report.summary).await;
                Err(e)
            },
        }
    }

    async fn process_post_call(
        &self,
        caller: &LeadFacts,
        conversation: ConversationInput,
        report: &mut ReconciliationReport,
    ) -> Result<(), ServiceError> {
        let transcript = conversation.transcript.clone().unwrap_or_default();
        if caller.is_anonymous() && transcript.trim().is_empty() {
            return Err(ServiceError::Validation(
                "call has neither caller identity nor transcript".to_owned(),
            ));
        }
        let conversation_id = self.open_conversation(conversation, &mut report.summary).await?;

        // Caller ID known: link before extraction so the conversation is
        // attached even when extraction fails.
        let mut owner = None;
        if !caller.is_anonymous() {
            let resolved = self.resolver.resolve(caller).await?;
            note_lead(&mut report.summary, &resolved);
            let lead_id = self.link(&conversation_id, &resolved.lead).await?;
            let lead = self.owning_lead(&lead_id, resolved.lead).await?;
            report.summary.lead_id = Some(lead_id.clone());
            owner = Some((lead_id, lead));
        }

        self.storage.set_extraction_status(&conversation_id, ExtractionStatus::Processing).await?;
        let outcome = match self.extractor.extract(&transcript).await {
            Ok(outcome) => outcome,
            Err(source) => {
                tracing::warn!(
                    error = %source,
                    conversation_id = %conversation_id,
                    "Extraction failed, marking conversation failed"
                );
                self.storage.set_extraction_status(&conversation_id, ExtractionStatus::Failed).await?;
                report.extraction_status = Some(ExtractionStatus::Failed);
                return Err(ServiceError::ExtractionFailed { conversation_id, source });
            },
        };

        let (fields, raw_payload) = match outcome {
            ExtractionOutcome::Skipped => {
                tracing::info!(conversation_id = %conversation_id, "Blank transcript, extraction skipped");
                self.storage.set_extraction_status(&conversation_id, ExtractionStatus::Skipped).await?;
                report.extraction_status = Some(ExtractionStatus::Skipped);
                return Ok(());
            },
            ExtractionOutcome::Extracted { fields, raw_payload } => {
                (fields.retain_confident(self.settings.min_confidence), raw_payload)
            },
        };

        let lead_id = match owner {
            Some((lead_id, lead)) => {
                self.enrich_from_extraction(lead, &caller.source, &fields, &mut report.summary)
                    .await?;
                lead_id
            },
            None => {
                let facts = fields.lead_facts(&caller.source, self.settings.default_region);
                if facts.is_anonymous() {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        "Transcript did not identify an anonymous caller"
                    );
                    self.storage
                        .set_extraction_status(&conversation_id, ExtractionStatus::Failed)
                        .await?;
                    report.extraction_status = Some(ExtractionStatus::Failed);
                    return Err(ServiceError::Validation(
                        "transcript did not reveal who the caller is".to_owned(),
                    ));
                }
                let resolved = self.resolver.resolve(&facts).await?;
                note_lead(&mut report.summary, &resolved);
                let lead_id = self.link(&conversation_id, &resolved.lead).await?;
                report.summary.lead_id = Some(lead_id.clone());
                lead_id
            },
        };

        self.persist_extraction(&conversation_id, &lead_id, fields, raw_payload, &mut report.summary)
            .await?;
        self.storage.set_extraction_status(&conversation_id, ExtractionStatus::Done).await?;
        report.extraction_status = Some(ExtractionStatus::Done);
        Ok(())
    }

    /// Extracted name/email fill gaps on the lead that owns the conversation.
    async fn enrich_from_extraction(
        &self,
        lead: Lead,
        source: &str,
        fields: &ExtractedLead,
        summary: &mut WorkflowSummary,
    ) -> Result<(), ServiceError> {
        let facts = fields.lead_facts(source, self.settings.default_region);
        if facts.first_name.is_none() && facts.last_name.is_none() && facts.email.is_none() {
            return Ok(());
        }
        let facts = LeadFacts { phone: None, ..facts };
        let resolved = self.resolver.enrich(lead, &facts).await?;
        note_lead(summary, &resolved);
        Ok(())
    }

    async fn persist_extraction(
        &self,
        conversation_id: &str,
        lead_id: &str,
        fields: ExtractedLead,
        raw_payload: String,
        summary: &mut WorkflowSummary,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let version = self.extractor.version().to_owned();
        let profile = AiProfile::from_extraction(lead_id, conversation_id, &fields, &version, now);
        let extraction = Extraction {
            conversation_id: conversation_id.to_owned(),
            lead_id: lead_id.to_owned(),
            fields,
            extraction_version: version,
            raw_extraction_payload: raw_payload,
            created_at: now,
        };

        summary.extraction_upserted =
            best_effort("extraction_upsert", self.storage.upsert_extraction(&extraction))
                .await
                .is_some();
        self.storage.upsert_profile(&profile).await?;
        summary.profile_upserted = true;
        tracing::info!(
            lead_id,
            conversation_id,
            completeness = profile.completeness_score,
            confidence = profile.confidence_score,
            "Upserted AI profile"
        );
        Ok(())
    }
}

/// Status to report after a terminal transition request.
pub(super) fn status_after(outcome: &TransitionOutcome, requested: WorkflowStatus) -> WorkflowStatus {
    match outcome {
        TransitionOutcome::Applied(_) => requested,
        TransitionOutcome::Rejected { current } => *current,
    }
}
