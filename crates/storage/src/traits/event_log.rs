use async_trait::async_trait;
use leadflow_core::{EventRecord, Provider, WebhookEvent};

use crate::error::StorageError;

/// Append-only audit log of inbound provider events.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Append, ignoring a repeat of the same `(provider, external_event_id)`.
    async fn append_event(&self, event: &WebhookEvent) -> Result<EventRecord, StorageError>;

    async fn count_events(&self, provider: Option<Provider>) -> Result<usize, StorageError>;
}
