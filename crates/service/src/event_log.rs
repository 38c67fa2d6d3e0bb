use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{EventRecord, Provider, WebhookEvent, MAX_EVENT_PAYLOAD_BYTES};
use leadflow_storage::traits::EventLogStore;
use leadflow_storage::StorageBackend;
use sha2::{Digest, Sha256};

use crate::side_effects::best_effort;

/// Audit log of inbound provider events. Never fails the handler.
pub struct EventLogService {
    storage: Arc<StorageBackend>,
}

impl EventLogService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Append the raw body under `external_event_id`, or under the body's
    /// SHA-256 digest when the provider sent no id.
    ///
    /// Returns `None` when the write failed; the failure is already logged.
    pub async fn record(
        &self,
        provider: Provider,
        external_event_id: Option<&str>,
        raw_body: &[u8],
    ) -> Option<EventRecord> {
        let event = WebhookEvent {
            provider,
            external_event_id: event_key(external_event_id, raw_body),
            raw_payload: payload_text(raw_body),
            received_at: Utc::now(),
        };
        let outcome = best_effort("event_log", self.storage.append_event(&event)).await;
        if outcome == Some(EventRecord::Duplicate) {
            tracing::info!(
                provider = provider.as_str(),
                event_id = %event.external_event_id,
                "Replayed event, processing again"
            );
        }
        outcome
    }
}

/// Idempotency key of an event.
#[must_use]
pub fn event_key(external_event_id: Option<&str>, raw_body: &[u8]) -> String {
    match external_event_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_owned(),
        None => hex::encode(Sha256::digest(raw_body)),
    }
}

fn payload_text(raw_body: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw_body);
    if text.len() <= MAX_EVENT_PAYLOAD_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_EVENT_PAYLOAD_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}
