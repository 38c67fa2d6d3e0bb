//! EventLogStore implementation for PgStorage.

use super::*;

use crate::traits::EventLogStore;
use async_trait::async_trait;
use leadflow_core::{EventRecord, Provider, WebhookEvent};

#[async_trait]
impl EventLogStore for PgStorage {
    async fn append_event(&self, event: &WebhookEvent) -> Result<EventRecord, StorageError> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (provider, external_event_id, raw_payload, received_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (provider, external_event_id) DO NOTHING",
        )
        .bind(event.provider.as_str())
        .bind(&event.external_event_id)
        .bind(&event.raw_payload)
        .bind(event.received_at)
        .execute(&self.pool)
        .await?;
        Ok(if result.rows_affected() == 0 { EventRecord::Duplicate } else { EventRecord::Recorded })
    }

    async fn count_events(&self, provider: Option<Provider>) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM webhook_events WHERE $1::TEXT IS NULL OR provider = $1",
        )
        .bind(provider.map(|p| p.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(usize_from_count(count))
    }
}
