//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by domain concern.

mod conversations;
mod events;
mod extractions;
mod leads;
mod workflows;

use std::str::FromStr;

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use leadflow_core::{
    AiProfile, Conversation, Extraction, Lead, LeadTemperature, PhoneMapping, WorkflowExecution,
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::pg_migrations::run_pg_migrations;

pub(crate) const LEAD_COLUMNS: &str = "id, phone_e164, phone_raw, first_name, last_name, email, \
                                       source, status, notes, created_at, updated_at";

pub(crate) const CONVERSATION_COLUMNS: &str = "id, lead_id, external_call_id, transcript, \
                                               duration_secs, sentiment_score, \
                                               extraction_status, created_at";

pub(crate) const PROFILE_COLUMNS: &str = "lead_id, conversation_id, temperature, property_type, \
                                          loan_type, price_range, timeline, pre_approval_status, \
                                          concerns, interested_in, requested_actions, summary, \
                                          completeness_score, confidence_score, \
                                          extraction_version, updated_at";

pub(crate) const EXECUTION_COLUMNS: &str = "execution_id, workflow_name, status, error_message, \
                                            output_data, started_at, completed_at";

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// # Errors
    /// Returns error if the database cannot be reached or migrated.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(std::time::Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::info!("PgStorage initialized");
        Ok(Self { pool })
    }
}

fn parse_column<T>(column: &str, value: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| StorageError::corrupt(format!("invalid {column}: {value}"), e))
}

pub(crate) fn usize_from_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

pub(crate) fn row_to_lead(row: &PgRow) -> Result<Lead, StorageError> {
    Ok(Lead {
        id: row.try_get("id")?,
        phone_e164: row.try_get("phone_e164")?,
        phone_raw: row.try_get("phone_raw")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        source: row.try_get("source")?,
        status: parse_column("lead status", &row.try_get::<String, _>("status")?)?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_mapping(row: &PgRow) -> Result<PhoneMapping, StorageError> {
    Ok(PhoneMapping {
        phone_e164: row.try_get("phone_e164")?,
        lead_id: row.try_get("lead_id")?,
        display_name: row.try_get("display_name")?,
        last_updated: row.try_get("last_updated")?,
    })
}

pub(crate) fn row_to_conversation(row: &PgRow) -> Result<Conversation, StorageError> {
    Ok(Conversation {
        id: row.try_get("id")?,
        lead_id: row.try_get("lead_id")?,
        external_call_id: row.try_get("external_call_id")?,
        transcript: row.try_get("transcript")?,
        duration_secs: row.try_get("duration_secs")?,
        sentiment_score: row.try_get("sentiment_score")?,
        extraction_status: parse_column(
            "extraction status",
            &row.try_get::<String, _>("extraction_status")?,
        )?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn row_to_extraction(row: &PgRow) -> Result<Extraction, StorageError> {
    let fields: serde_json::Value = row.try_get("fields")?;
    Ok(Extraction {
        conversation_id: row.try_get("conversation_id")?,
        lead_id: row.try_get("lead_id")?,
        fields: serde_json::from_value(fields)?,
        extraction_version: row.try_get("extraction_version")?,
        raw_extraction_payload: row.try_get("raw_extraction_payload")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn row_to_profile(row: &PgRow) -> Result<AiProfile, StorageError> {
    let temperature: Option<String> = row.try_get("temperature")?;
    let concerns: serde_json::Value = row.try_get("concerns")?;
    let interested_in: serde_json::Value = row.try_get("interested_in")?;
    let requested_actions: serde_json::Value = row.try_get("requested_actions")?;
    Ok(AiProfile {
        lead_id: row.try_get("lead_id")?,
        conversation_id: row.try_get("conversation_id")?,
        temperature: temperature
            .map(|t| parse_column::<LeadTemperature>("temperature", &t))
            .transpose()?,
        property_type: row.try_get("property_type")?,
        loan_type: row.try_get("loan_type")?,
        price_range: row.try_get("price_range")?,
        timeline: row.try_get("timeline")?,
        pre_approval_status: row.try_get("pre_approval_status")?,
        concerns: serde_json::from_value(concerns)?,
        interested_in: serde_json::from_value(interested_in)?,
        requested_actions: serde_json::from_value(requested_actions)?,
        summary: row.try_get("summary")?,
        completeness_score: row.try_get("completeness_score")?,
        confidence_score: row.try_get("confidence_score")?,
        extraction_version: row.try_get("extraction_version")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_execution(row: &PgRow) -> Result<WorkflowExecution, StorageError> {
    let output: Option<serde_json::Value> = row.try_get("output_data")?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at")?;
    Ok(WorkflowExecution {
        execution_id: row.try_get("execution_id")?,
        workflow_name: row.try_get("workflow_name")?,
        status: parse_column("workflow status", &row.try_get::<String, _>("status")?)?,
        error_message: row.try_get("error_message")?,
        output_data: output.map(serde_json::from_value).transpose()?,
        started_at: row.try_get("started_at")?,
        completed_at,
    })
}
