//! ExtractionStore implementation for PgStorage.

use super::*;

use crate::traits::ExtractionStore;
use async_trait::async_trait;

#[async_trait]
impl ExtractionStore for PgStorage {
    async fn upsert_extraction(&self, extraction: &Extraction) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO extractions
               (conversation_id, lead_id, fields, extraction_version, raw_extraction_payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (conversation_id) DO UPDATE SET
               lead_id = EXCLUDED.lead_id,
               fields = EXCLUDED.fields,
               extraction_version = EXCLUDED.extraction_version,
               raw_extraction_payload = EXCLUDED.raw_extraction_payload",
        )
        .bind(&extraction.conversation_id)
        .bind(&extraction.lead_id)
        .bind(serde_json::to_value(&extraction.fields)?)
        .bind(&extraction.extraction_version)
        .bind(&extraction.raw_extraction_payload)
        .bind(extraction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_extraction(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Extraction>, StorageError> {
        let row = sqlx::query(
            "SELECT conversation_id, lead_id, fields, extraction_version,
                    raw_extraction_payload, created_at
             FROM extractions WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_extraction(&r)).transpose()
    }

    async fn upsert_profile(&self, profile: &AiProfile) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO ai_profiles ({PROFILE_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
             ON CONFLICT (lead_id, conversation_id) DO UPDATE SET
               temperature = EXCLUDED.temperature,
               property_type = EXCLUDED.property_type,
               loan_type = EXCLUDED.loan_type,
               price_range = EXCLUDED.price_range,
               timeline = EXCLUDED.timeline,
               pre_approval_status = EXCLUDED.pre_approval_status,
               concerns = EXCLUDED.concerns,
               interested_in = EXCLUDED.interested_in,
               requested_actions = EXCLUDED.requested_actions,
               summary = EXCLUDED.summary,
               completeness_score = EXCLUDED.completeness_score,
               confidence_score = EXCLUDED.confidence_score,
               extraction_version = EXCLUDED.extraction_version,
               updated_at = EXCLUDED.updated_at"
        ))
        .bind(&profile.lead_id)
        .bind(&profile.conversation_id)
        .bind(profile.temperature.map(|t| t.as_str()))
        .bind(&profile.property_type)
        .bind(&profile.loan_type)
        .bind(&profile.price_range)
        .bind(&profile.timeline)
        .bind(&profile.pre_approval_status)
        .bind(serde_json::to_value(&profile.concerns)?)
        .bind(serde_json::to_value(&profile.interested_in)?)
        .bind(serde_json::to_value(&profile.requested_actions)?)
        .bind(&profile.summary)
        .bind(profile.completeness_score)
        .bind(profile.confidence_score)
        .bind(&profile.extraction_version)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(
        &self,
        lead_id: &str,
        conversation_id: &str,
    ) -> Result<Option<AiProfile>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM ai_profiles
             WHERE lead_id = $1 AND conversation_id = $2"
        ))
        .bind(lead_id)
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_profile(&r)).transpose()
    }

    async fn get_lead_profiles(&self, lead_id: &str) -> Result<Vec<AiProfile>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM ai_profiles
             WHERE lead_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_profile).collect()
    }
}
