use leadflow_core::{EventRecord, Provider, WebhookEvent};
use rusqlite::params;

use super::{get_conn, to_rfc3339, Storage};
use crate::error::StorageError;

impl Storage {
    /// Append to the event log; a repeated `(provider, external_event_id)` is ignored.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn append_event(&self, event: &WebhookEvent) -> Result<EventRecord, StorageError> {
        let conn = get_conn(&self.pool)?;
        let inserted = conn.execute(
            "INSERT INTO webhook_events (provider, external_event_id, raw_payload, received_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(provider, external_event_id) DO NOTHING",
            params![
                event.provider.as_str(),
                event.external_event_id,
                event.raw_payload,
                to_rfc3339(event.received_at),
            ],
        )?;
        Ok(if inserted == 0 { EventRecord::Duplicate } else { EventRecord::Recorded })
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn count_events(&self, provider: Option<Provider>) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let count: i64 = match provider {
            Some(p) => conn.query_row(
                "SELECT COUNT(*) FROM webhook_events WHERE provider = ?1",
                params![p.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM webhook_events", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }
}
