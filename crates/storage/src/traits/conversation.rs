use async_trait::async_trait;
use leadflow_core::{Conversation, ExtractionStatus};

use crate::error::StorageError;
use crate::types::ConversationUpsert;

/// Conversation lifecycle operations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert by `external_call_id`, or refresh the existing row.
    ///
    /// Refreshing never clears stored values and never moves an already
    /// linked conversation to another lead.
    async fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationUpsert, StorageError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError>;

    async fn get_conversation_by_external_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<Conversation>, StorageError>;

    /// Assign the conversation to `lead_id` if it has no owner yet.
    /// Returns the owning lead id afterwards, `None` if the conversation is missing.
    async fn link_conversation(
        &self,
        id: &str,
        lead_id: &str,
    ) -> Result<Option<String>, StorageError>;

    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<(), StorageError>;

    async fn get_lead_conversations(&self, lead_id: &str)
    -> Result<Vec<Conversation>, StorageError>;
}
