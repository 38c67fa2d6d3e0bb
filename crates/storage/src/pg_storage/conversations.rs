//! ConversationStore implementation for PgStorage.

use super::*;

use crate::traits::ConversationStore;
use crate::types::ConversationUpsert;
use async_trait::async_trait;
use leadflow_core::ExtractionStatus;

#[async_trait]
impl ConversationStore for PgStorage {
    async fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationUpsert, StorageError> {
        let transcript = conversation.transcript.as_deref().filter(|t| !t.trim().is_empty());
        let row = sqlx::query(&format!(
            "INSERT INTO conversations ({CONVERSATION_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
             ON CONFLICT (external_call_id) DO UPDATE SET
               transcript = COALESCE(EXCLUDED.transcript, conversations.transcript),
               duration_secs = COALESCE(EXCLUDED.duration_secs, conversations.duration_secs),
               sentiment_score = COALESCE(EXCLUDED.sentiment_score, conversations.sentiment_score),
               lead_id = COALESCE(conversations.lead_id, EXCLUDED.lead_id)
             RETURNING {CONVERSATION_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(&conversation.id)
        .bind(&conversation.lead_id)
        .bind(&conversation.external_call_id)
        .bind(transcript)
        .bind(conversation.duration_secs)
        .bind(conversation.sentiment_score)
        .bind(conversation.extraction_status.as_str())
        .bind(conversation.created_at)
        .fetch_one(&self.pool)
        .await?;
        let created: bool = row.try_get("inserted")?;
        Ok(ConversationUpsert { conversation: row_to_conversation(&row)?, created })
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_conversation(&r)).transpose()
    }

    async fn get_conversation_by_external_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE external_call_id = $1"
        ))
        .bind(external_call_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_conversation(&r)).transpose()
    }

    async fn link_conversation(
        &self,
        id: &str,
        lead_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let owner: Option<Option<String>> = sqlx::query_scalar(
            "UPDATE conversations SET lead_id = COALESCE(lead_id, $2)
             WHERE id = $1
             RETURNING lead_id",
        )
        .bind(id)
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner.flatten())
    }

    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE conversations SET extraction_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound { entity: "conversation", id: id.to_owned() });
        }
        Ok(())
    }

    async fn get_lead_conversations(
        &self,
        lead_id: &str,
    ) -> Result<Vec<Conversation>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE lead_id = $1 ORDER BY created_at DESC"
        ))
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_conversation).collect()
    }
}
