//! Async trait implementations for `SQLite` `Storage` via `spawn_blocking`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadflow_core::{
    AiProfile, Conversation, EventRecord, Extraction, ExtractionStatus, Lead, LeadFacts,
    PhoneMapping, Provider, TransitionOutcome, WebhookEvent, WorkflowExecution, WorkflowStatus,
    WorkflowSummary,
};

use crate::error::StorageError;
use crate::traits::{ConversationStore, EventLogStore, ExtractionStore, LeadStore, WorkflowStore};
use crate::types::{ConversationUpsert, LeadInsert, LeadMerge};
use crate::Storage;

/// Helper: run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Body-generating macro for async-to-blocking delegation.
///
/// Each argument is annotated with a capture kind:
/// - `@ref arg`     : `.clone()` a `&T`, pass as `&arg`
/// - `@str arg`     : `.to_owned()` a `&str`, pass as `&arg`
/// - `@opt_str arg` : `.map(ToOwned::to_owned)` an `Option<&str>`, pass as `arg.as_deref()`
/// - `@opt_ref arg` : `.cloned()` an `Option<&T>`, pass as `arg.as_ref()`
/// - `@val arg`     : move directly (Copy/owned types)
macro_rules! delegate {
    ($self:ident, $method:ident $(, @$kind:ident $arg:ident)*) => {{
        let s = $self.clone();
        $(delegate!(@capture $kind $arg);)*
        blocking(move || s.$method($(delegate!(@pass $kind $arg)),*)).await
    }};
    (@capture ref $arg:ident) => { let $arg = $arg.clone(); };
    (@capture str $arg:ident) => { let $arg = $arg.to_owned(); };
    (@capture opt_str $arg:ident) => { let $arg = $arg.map(ToOwned::to_owned); };
    (@capture opt_ref $arg:ident) => { let $arg = $arg.cloned(); };
    (@capture val $arg:ident) => { };
    (@pass ref $arg:ident) => { &$arg };
    (@pass str $arg:ident) => { &$arg };
    (@pass opt_str $arg:ident) => { $arg.as_deref() };
    (@pass opt_ref $arg:ident) => { $arg.as_ref() };
    (@pass val $arg:ident) => { $arg };
}

// ── LeadStore ────────────────────────────────────────────────────

#[async_trait]
impl LeadStore for Storage {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StorageError> {
        delegate!(self, get_lead, @str id)
    }
    async fn get_lead_by_phone(&self, phone_e164: &str) -> Result<Option<Lead>, StorageError> {
        delegate!(self, get_lead_by_phone, @str phone_e164)
    }
    async fn get_phone_mapping(
        &self,
        phone_e164: &str,
    ) -> Result<Option<PhoneMapping>, StorageError> {
        delegate!(self, get_phone_mapping, @str phone_e164)
    }
    async fn upsert_phone_mapping(&self, mapping: &PhoneMapping) -> Result<(), StorageError> {
        delegate!(self, upsert_phone_mapping, @ref mapping)
    }
    async fn insert_lead(&self, lead: &Lead) -> Result<LeadInsert, StorageError> {
        delegate!(self, insert_lead, @ref lead)
    }
    async fn merge_lead_facts(
        &self,
        id: &str,
        facts: &LeadFacts,
        now: DateTime<Utc>,
    ) -> Result<Option<LeadMerge>, StorageError> {
        delegate!(self, merge_lead_facts, @str id, @ref facts, @val now)
    }
    async fn count_leads(&self) -> Result<usize, StorageError> {
        delegate!(self, count_leads)
    }
    async fn count_phone_mappings(&self) -> Result<usize, StorageError> {
        delegate!(self, count_phone_mappings)
    }
}

// ── ConversationStore ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for Storage {
    async fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationUpsert, StorageError> {
        delegate!(self, upsert_conversation, @ref conversation)
    }
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        delegate!(self, get_conversation, @str id)
    }
    async fn get_conversation_by_external_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        delegate!(self, get_conversation_by_external_id, @str external_call_id)
    }
    async fn link_conversation(
        &self,
        id: &str,
        lead_id: &str,
    ) -> Result<Option<String>, StorageError> {
        delegate!(self, link_conversation, @str id, @str lead_id)
    }
    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<(), StorageError> {
        delegate!(self, set_extraction_status, @str id, @val status)
    }
    async fn get_lead_conversations(
        &self,
        lead_id: &str,
    ) -> Result<Vec<Conversation>, StorageError> {
        delegate!(self, get_lead_conversations, @str lead_id)
    }
}

// ── ExtractionStore ──────────────────────────────────────────────

#[async_trait]
impl ExtractionStore for Storage {
    async fn upsert_extraction(&self, extraction: &Extraction) -> Result<(), StorageError> {
        delegate!(self, upsert_extraction, @ref extraction)
    }
    async fn get_extraction(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Extraction>, StorageError> {
        delegate!(self, get_extraction, @str conversation_id)
    }
    async fn upsert_profile(&self, profile: &AiProfile) -> Result<(), StorageError> {
        delegate!(self, upsert_profile, @ref profile)
    }
    async fn get_profile(
        &self,
        lead_id: &str,
        conversation_id: &str,
    ) -> Result<Option<AiProfile>, StorageError> {
        delegate!(self, get_profile, @str lead_id, @str conversation_id)
    }
    async fn get_lead_profiles(&self, lead_id: &str) -> Result<Vec<AiProfile>, StorageError> {
        delegate!(self, get_lead_profiles, @str lead_id)
    }
}

// ── WorkflowStore ────────────────────────────────────────────────

#[async_trait]
impl WorkflowStore for Storage {
    async fn begin_execution(
        &self,
        execution_id: &str,
        workflow_name: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, StorageError> {
        delegate!(self, begin_execution, @str execution_id, @str workflow_name, @val now)
    }
    async fn transition_execution(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        output: Option<&WorkflowSummary>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StorageError> {
        delegate!(
            self,
            transition_execution,
            @str execution_id,
            @val next,
            @opt_str error_message,
            @opt_ref output,
            @val now
        )
    }
    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<WorkflowExecution>, StorageError> {
        delegate!(self, get_execution, @str execution_id)
    }
}

// ── EventLogStore ────────────────────────────────────────────────

#[async_trait]
impl EventLogStore for Storage {
    async fn append_event(&self, event: &WebhookEvent) -> Result<EventRecord, StorageError> {
        delegate!(self, append_event, @ref event)
    }
    async fn count_events(&self, provider: Option<Provider>) -> Result<usize, StorageError> {
        delegate!(self, count_events, @val provider)
    }
}
