use async_trait::async_trait;
use leadflow_core::{AiProfile, Extraction};

use crate::error::StorageError;

/// Extraction and AI profile upserts.
#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Insert or replace the extraction of `extraction.conversation_id`.
    async fn upsert_extraction(&self, extraction: &Extraction) -> Result<(), StorageError>;

    async fn get_extraction(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Extraction>, StorageError>;

    /// Insert or replace the profile keyed by `(lead_id, conversation_id)`.
    async fn upsert_profile(&self, profile: &AiProfile) -> Result<(), StorageError>;

    async fn get_profile(
        &self,
        lead_id: &str,
        conversation_id: &str,
    ) -> Result<Option<AiProfile>, StorageError>;

    /// Profiles of a lead, most recently updated first.
    async fn get_lead_profiles(&self, lead_id: &str) -> Result<Vec<AiProfile>, StorageError>;
}
