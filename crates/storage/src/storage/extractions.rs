use leadflow_core::{AiProfile, Extraction, LeadTemperature};
use rusqlite::{params, OptionalExtension as _};

use super::{get_conn, parse_enum, parse_json, parse_ts, to_rfc3339, Storage};
use crate::error::StorageError;

const PROFILE_COLUMNS: &str = "lead_id, conversation_id, temperature, property_type, loan_type, \
                               price_range, timeline, pre_approval_status, concerns, \
                               interested_in, requested_actions, summary, completeness_score, \
                               confidence_score, extraction_version, updated_at";

fn row_to_extraction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Extraction> {
    Ok(Extraction {
        conversation_id: row.get(0)?,
        lead_id: row.get(1)?,
        fields: parse_json(2, &row.get::<_, String>(2)?)?,
        extraction_version: row.get(3)?,
        raw_extraction_payload: row.get(4)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<AiProfile> {
    let temperature: Option<String> = row.get(2)?;
    Ok(AiProfile {
        lead_id: row.get(0)?,
        conversation_id: row.get(1)?,
        temperature: temperature.map(|t| parse_enum::<LeadTemperature>(2, &t)).transpose()?,
        property_type: row.get(3)?,
        loan_type: row.get(4)?,
        price_range: row.get(5)?,
        timeline: row.get(6)?,
        pre_approval_status: row.get(7)?,
        concerns: parse_json(8, &row.get::<_, String>(8)?)?,
        interested_in: parse_json(9, &row.get::<_, String>(9)?)?,
        requested_actions: parse_json(10, &row.get::<_, String>(10)?)?,
        summary: row.get(11)?,
        completeness_score: row.get(12)?,
        confidence_score: row.get(13)?,
        extraction_version: row.get(14)?,
        updated_at: parse_ts(15, &row.get::<_, String>(15)?)?,
    })
}

impl Storage {
    /// Insert or replace the extraction for a conversation.
    ///
    /// # Errors
    /// Returns error if serialization or the database write fails.
    pub fn upsert_extraction(&self, extraction: &Extraction) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        let fields = serde_json::to_string(&extraction.fields)?;
        conn.execute(
            "INSERT INTO extractions
               (conversation_id, lead_id, fields, extraction_version, raw_extraction_payload, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(conversation_id) DO UPDATE SET
                 lead_id = excluded.lead_id,
                 fields = excluded.fields,
                 extraction_version = excluded.extraction_version,
                 raw_extraction_payload = excluded.raw_extraction_payload",
            params![
                extraction.conversation_id,
                extraction.lead_id,
                fields,
                extraction.extraction_version,
                extraction.raw_extraction_payload,
                to_rfc3339(extraction.created_at),
            ],
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_extraction(&self, conversation_id: &str) -> Result<Option<Extraction>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let extraction = conn
            .query_row(
                "SELECT conversation_id, lead_id, fields, extraction_version,
                        raw_extraction_payload, created_at
                   FROM extractions WHERE conversation_id = ?1",
                params![conversation_id],
                row_to_extraction,
            )
            .optional()?;
        Ok(extraction)
    }

    /// Insert or replace the profile for `(lead_id, conversation_id)`.
    ///
    /// # Errors
    /// Returns error if serialization or the database write fails.
    pub fn upsert_profile(&self, profile: &AiProfile) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            &format!(
                "INSERT INTO ai_profiles ({PROFILE_COLUMNS})
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                   ON CONFLICT(lead_id, conversation_id) DO UPDATE SET
                     temperature = excluded.temperature,
                     property_type = excluded.property_type,
                     loan_type = excluded.loan_type,
                     price_range = excluded.price_range,
                     timeline = excluded.timeline,
                     pre_approval_status = excluded.pre_approval_status,
                     concerns = excluded.concerns,
                     interested_in = excluded.interested_in,
                     requested_actions = excluded.requested_actions,
                     summary = excluded.summary,
                     completeness_score = excluded.completeness_score,
                     confidence_score = excluded.confidence_score,
                     extraction_version = excluded.extraction_version,
                     updated_at = excluded.updated_at"
            ),
            params![
                profile.lead_id,
                profile.conversation_id,
                profile.temperature.map(|t| t.as_str()),
                profile.property_type,
                profile.loan_type,
                profile.price_range,
                profile.timeline,
                profile.pre_approval_status,
                serde_json::to_string(&profile.concerns)?,
                serde_json::to_string(&profile.interested_in)?,
                serde_json::to_string(&profile.requested_actions)?,
                profile.summary,
                profile.completeness_score,
                profile.confidence_score,
                profile.extraction_version,
                to_rfc3339(profile.updated_at),
            ],
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_profile(
        &self,
        lead_id: &str,
        conversation_id: &str,
    ) -> Result<Option<AiProfile>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let profile = conn
            .query_row(
                &format!(
                    "SELECT {PROFILE_COLUMNS} FROM ai_profiles
                       WHERE lead_id = ?1 AND conversation_id = ?2"
                ),
                params![lead_id, conversation_id],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_lead_profiles(&self, lead_id: &str) -> Result<Vec<AiProfile>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM ai_profiles
               WHERE lead_id = ?1 ORDER BY updated_at DESC"
        ))?;
        let profiles = stmt
            .query_map(params![lead_id], row_to_profile)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }
}
