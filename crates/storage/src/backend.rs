//! Unified storage backend with enum dispatch.

#[cfg(feature = "sqlite")]
use std::path::Path;

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

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite(s) => <crate::Storage as $trait>::$method(s, $($arg),*).await,
            #[cfg(feature = "postgres")]
            StorageBackend::Postgres(s) => <crate::pg_storage::PgStorage as $trait>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    #[cfg(feature = "sqlite")]
    Sqlite(crate::Storage),
    #[cfg(feature = "postgres")]
    Postgres(crate::pg_storage::PgStorage),
}

impl StorageBackend {
    /// # Errors
    /// Returns error if the database cannot be opened or migrated.
    #[cfg(feature = "sqlite")]
    pub fn new_sqlite(db_path: &Path) -> Result<Self, StorageError> {
        Ok(Self::Sqlite(crate::Storage::new(db_path)?))
    }

    /// # Errors
    /// Returns error if the database cannot be reached or migrated.
    #[cfg(feature = "postgres")]
    pub async fn new_postgres(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::Postgres(crate::pg_storage::PgStorage::new(database_url).await?))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }
}

// ── LeadStore ────────────────────────────────────────────────────

#[async_trait]
impl LeadStore for StorageBackend {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StorageError> {
        dispatch!(self, LeadStore, get_lead(id))
    }

    async fn get_lead_by_phone(&self, phone_e164: &str) -> Result<Option<Lead>, StorageError> {
        dispatch!(self, LeadStore, get_lead_by_phone(phone_e164))
    }

    async fn get_phone_mapping(
        &self,
        phone_e164: &str,
    ) -> Result<Option<PhoneMapping>, StorageError> {
        dispatch!(self, LeadStore, get_phone_mapping(phone_e164))
    }

    async fn upsert_phone_mapping(&self, mapping: &PhoneMapping) -> Result<(), StorageError> {
        dispatch!(self, LeadStore, upsert_phone_mapping(mapping))
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<LeadInsert, StorageError> {
        dispatch!(self, LeadStore, insert_lead(lead))
    }

    async fn merge_lead_facts(
        &self,
        id: &str,
        facts: &LeadFacts,
        now: DateTime<Utc>,
    ) -> Result<Option<LeadMerge>, StorageError> {
        dispatch!(self, LeadStore, merge_lead_facts(id, facts, now))
    }

    async fn count_leads(&self) -> Result<usize, StorageError> {
        dispatch!(self, LeadStore, count_leads())
    }

    async fn count_phone_mappings(&self) -> Result<usize, StorageError> {
        dispatch!(self, LeadStore, count_phone_mappings())
    }
}

// ── ConversationStore ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for StorageBackend {
    async fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationUpsert, StorageError> {
        dispatch!(self, ConversationStore, upsert_conversation(conversation))
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        dispatch!(self, ConversationStore, get_conversation(id))
    }

    async fn get_conversation_by_external_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        dispatch!(self, ConversationStore, get_conversation_by_external_id(external_call_id))
    }

    async fn link_conversation(
        &self,
        id: &str,
        lead_id: &str,
    ) -> Result<Option<String>, StorageError> {
        dispatch!(self, ConversationStore, link_conversation(id, lead_id))
    }

    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<(), StorageError> {
        dispatch!(self, ConversationStore, set_extraction_status(id, status))
    }

    async fn get_lead_conversations(
        &self,
        lead_id: &str,
    ) -> Result<Vec<Conversation>, StorageError> {
        dispatch!(self, ConversationStore, get_lead_conversations(lead_id))
    }
}

// ── ExtractionStore ──────────────────────────────────────────────

#[async_trait]
impl ExtractionStore for StorageBackend {
    async fn upsert_extraction(&self, extraction: &Extraction) -> Result<(), StorageError> {
        dispatch!(self, ExtractionStore, upsert_extraction(extraction))
    }

    async fn get_extraction(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Extraction>, StorageError> {
        dispatch!(self, ExtractionStore, get_extraction(conversation_id))
    }

    async fn upsert_profile(&self, profile: &AiProfile) -> Result<(), StorageError> {
        dispatch!(self, ExtractionStore, upsert_profile(profile))
    }

    async fn get_profile(
        &self,
        lead_id: &str,
        conversation_id: &str,
    ) -> Result<Option<AiProfile>, StorageError> {
        dispatch!(self, ExtractionStore, get_profile(lead_id, conversation_id))
    }

    async fn get_lead_profiles(&self, lead_id: &str) -> Result<Vec<AiProfile>, StorageError> {
        dispatch!(self, ExtractionStore, get_lead_profiles(lead_id))
    }
}

// ── WorkflowStore ────────────────────────────────────────────────

#[async_trait]
impl WorkflowStore for StorageBackend {
    async fn begin_execution(
        &self,
        execution_id: &str,
        workflow_name: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, StorageError> {
        dispatch!(self, WorkflowStore, begin_execution(execution_id, workflow_name, now))
    }

    async fn transition_execution(
        &self,
        execution_id: &str,
        next: WorkflowStatus,
        error_message: Option<&str>,
        output: Option<&WorkflowSummary>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StorageError> {
        dispatch!(
            self,
            WorkflowStore,
            transition_execution(execution_id, next, error_message, output, now)
        )
    }

    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<WorkflowExecution>, StorageError> {
        dispatch!(self, WorkflowStore, get_execution(execution_id))
    }
}

// ── EventLogStore ────────────────────────────────────────────────

#[async_trait]
impl EventLogStore for StorageBackend {
    async fn append_event(&self, event: &WebhookEvent) -> Result<EventRecord, StorageError> {
        dispatch!(self, EventLogStore, append_event(event))
    }

    async fn count_events(&self, provider: Option<Provider>) -> Result<usize, StorageError> {
        dispatch!(self, EventLogStore, count_events(provider))
    }
}
