//! Audit records of inbound provider events.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// External system that delivered an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Crm,
    Voice,
    Workflow,
}

impl Provider {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Crm => "crm",
            Self::Voice => "voice",
            Self::Workflow => "workflow",
        }
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crm" => Ok(Self::Crm),
            "voice" => Ok(Self::Voice),
            "workflow" => Ok(Self::Workflow),
            _ => Err(CoreError::invalid("provider", s)),
        }
    }
}

/// Append-only audit row, unique per `(provider, external_event_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookEvent {
    pub provider: Provider,
    pub external_event_id: String,
    pub raw_payload: String,
    pub received_at: DateTime<Utc>,
}

/// Result of appending to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRecord {
    Recorded,
    /// An event with the same key was already logged.
    Duplicate,
}
