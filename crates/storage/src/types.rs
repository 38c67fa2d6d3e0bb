//! Outcome types returned by conflict-aware writes.

use leadflow_core::{Conversation, Lead};

/// Result of inserting a lead against the unique phone constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadInsert {
    /// The new row was written (with its phone mapping, when it has a phone).
    Applied(Lead),
    /// Another writer already owns the phone; this is the existing row.
    Conflict(Lead),
}

impl LeadInsert {
    #[must_use]
    pub const fn lead(&self) -> &Lead {
        match self {
            Self::Applied(lead) | Self::Conflict(lead) => lead,
        }
    }

    #[must_use]
    pub fn into_lead(self) -> Lead {
        match self {
            Self::Applied(lead) | Self::Conflict(lead) => lead,
        }
    }
}

/// Result of upserting a conversation by `external_call_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationUpsert {
    pub conversation: Conversation,
    pub created: bool,
}

/// Result of merging incoming facts into a stored lead.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadMerge {
    /// At least one field was written.
    Updated(Lead),
    /// The merge policy left the row as it was.
    Unchanged(Lead),
}

impl LeadMerge {
    #[must_use]
    pub fn into_lead(self) -> Lead {
        match self {
            Self::Updated(lead) | Self::Unchanged(lead) => lead,
        }
    }
}
