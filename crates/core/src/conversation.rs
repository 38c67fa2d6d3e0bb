//! Recorded interactions and their extraction lifecycle.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Progress of structured extraction for one conversation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Failed,
    Skipped,
}

impl ExtractionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for ExtractionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(CoreError::invalid("extraction status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    /// Unset until identity resolution links the conversation to a lead.
    pub lead_id: Option<String>,
    pub external_call_id: String,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
    pub sentiment_score: Option<f64>,
    pub extraction_status: ExtractionStatus,
    pub created_at: DateTime<Utc>,
}

/// Conversation data accepted at the ingress boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationInput {
    pub external_call_id: String,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
    pub sentiment_score: Option<f64>,
}

impl ConversationInput {
    #[must_use]
    pub fn has_transcript(&self) -> bool {
        self.transcript.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    #[must_use]
    pub fn into_conversation(self, id: String, now: DateTime<Utc>) -> Conversation {
        Conversation {
            id,
            lead_id: None,
            external_call_id: self.external_call_id,
            transcript: self.transcript,
            duration_secs: self.duration_secs,
            sentiment_score: self.sentiment_score,
            extraction_status: ExtractionStatus::Pending,
            created_at: now,
        }
    }
}

/// One utterance in a two-party transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: String,
    pub message: String,
}

/// Render turns as `role: message` lines, skipping empty utterances.
#[must_use]
pub fn render_transcript(turns: &[TranscriptTurn]) -> String {
    turns
        .iter()
        .filter(|t| !t.message.trim().is_empty())
        .map(|t| format!("{}: {}", t.role.trim(), t.message.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_skips_blank_turns() {
        let turns = vec![
            TranscriptTurn { role: "agent".to_owned(), message: "Hi, thanks for calling".to_owned() },
            TranscriptTurn { role: "user".to_owned(), message: "  ".to_owned() },
            TranscriptTurn { role: "user".to_owned(), message: "I want a condo".to_owned() },
        ];
        assert_eq!(render_transcript(&turns), "agent: Hi, thanks for calling\nuser: I want a condo");
    }

    #[test]
    fn blank_transcript_is_not_a_transcript() {
        let input = ConversationInput {
            external_call_id: "call-1".to_owned(),
            transcript: Some(" \n ".to_owned()),
            duration_secs: None,
            sentiment_score: None,
        };
        assert!(!input.has_transcript());
    }
}
