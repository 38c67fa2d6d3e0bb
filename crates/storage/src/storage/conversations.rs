use leadflow_core::{Conversation, ExtractionStatus};
use rusqlite::{params, Connection, OptionalExtension as _, TransactionBehavior};

use super::{get_conn, parse_enum, parse_ts, to_rfc3339, Storage};
use crate::error::StorageError;
use crate::types::ConversationUpsert;

const CONVERSATION_COLUMNS: &str = "id, lead_id, external_call_id, transcript, duration_secs, \
                                    sentiment_score, extraction_status, created_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        external_call_id: row.get(2)?,
        transcript: row.get(3)?,
        duration_secs: row.get(4)?,
        sentiment_score: row.get(5)?,
        extraction_status: parse_enum(6, &row.get::<_, String>(6)?)?,
        created_at: parse_ts(7, &row.get::<_, String>(7)?)?,
    })
}

fn select_conversation_by(
    conn: &Connection,
    column: &str,
    value: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE {column} = ?1"),
        params![value],
        row_to_conversation,
    )
    .optional()
}

impl Storage {
    /// Insert or refresh a conversation keyed by `external_call_id`.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationUpsert, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let transcript = conversation.transcript.as_deref().filter(|t| !t.trim().is_empty());

        let existing =
            select_conversation_by(&tx, "external_call_id", &conversation.external_call_id)?;
        let created = if let Some(existing) = existing {
            tx.execute(
                "UPDATE conversations SET
                   transcript = COALESCE(?2, transcript),
                   duration_secs = COALESCE(?3, duration_secs),
                   sentiment_score = COALESCE(?4, sentiment_score),
                   lead_id = COALESCE(lead_id, ?5)
                 WHERE id = ?1",
                params![
                    existing.id,
                    transcript,
                    conversation.duration_secs,
                    conversation.sentiment_score,
                    conversation.lead_id,
                ],
            )?;
            false
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO conversations ({CONVERSATION_COLUMNS})
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    conversation.id,
                    conversation.lead_id,
                    conversation.external_call_id,
                    transcript,
                    conversation.duration_secs,
                    conversation.sentiment_score,
                    conversation.extraction_status.as_str(),
                    to_rfc3339(conversation.created_at),
                ],
            )?;
            true
        };

        let stored = select_conversation_by(&tx, "external_call_id", &conversation.external_call_id)?
            .ok_or_else(|| StorageError::NotFound {
                entity: "conversation",
                id: conversation.external_call_id.clone(),
            })?;
        tx.commit()?;
        Ok(ConversationUpsert { conversation: stored, created })
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(select_conversation_by(&conn, "id", id)?)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_conversation_by_external_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(select_conversation_by(&conn, "external_call_id", external_call_id)?)
    }

    /// Assign an unowned conversation to `lead_id`; returns the owner afterwards.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn link_conversation(
        &self,
        id: &str,
        lead_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE conversations SET lead_id = ?2 WHERE id = ?1 AND lead_id IS NULL",
            params![id, lead_id],
        )?;
        let owner: Option<Option<String>> = tx
            .query_row("SELECT lead_id FROM conversations WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        tx.commit()?;
        Ok(owner.flatten())
    }

    /// # Errors
    /// Returns `StorageError::NotFound` if the conversation does not exist.
    pub fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        let updated = conn.execute(
            "UPDATE conversations SET extraction_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound { entity: "conversation", id: id.to_owned() });
        }
        Ok(())
    }

    /// Conversations of a lead, newest first.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn get_lead_conversations(&self, lead_id: &str) -> Result<Vec<Conversation>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
               WHERE lead_id = ?1 ORDER BY created_at DESC"
        ))?;
        let conversations = stmt
            .query_map(params![lead_id], row_to_conversation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conversations)
    }
}
