//! Transcript → structured lead extraction.

use std::borrow::Cow;

use async_trait::async_trait;
use leadflow_core::{
    first_json_object, strip_markdown_json, ExtractedLead, PipelineSettings, EXTRACTION_VERSION,
};

use crate::ai_types::{ChatRequest, Message, ResponseFormat};
use crate::client::{truncate, LlmClient};
use crate::error::LlmError;

const TRUNCATION_MARKER: &str = "\n\n[... middle of transcript omitted ...]\n\n";

const SYSTEM_PROMPT: &str = r#"You extract lead qualification data from a phone call transcript between a mortgage/real-estate agent and a caller.

Return ONLY a JSON object with exactly these keys:
- "name", "phone", "email", "property_type", "loan_type", "price_range", "timeline", "pre_approval_status":
  each an object {"value": string or null, "confidence": number between 0 and 1}
- "temperature": {"value": "hot" | "warm" | "cold" | null, "confidence": number between 0 and 1}
- "concerns": array of strings
- "interested_in": array of strings
- "requested_actions": array of strings

Rules:
- Use null with confidence 0 when the caller did not state a value.
- Never invent data that is not in the transcript.
- confidence reflects how explicitly the caller stated the value."#;

/// Result of running the extractor on one transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Blank transcript; the service was not called.
    Skipped,
    Extracted {
        fields: ExtractedLead,
        /// Model output exactly as received, kept for audit.
        raw_payload: String,
    },
}

/// Seam between the reconciliation pipeline and the extraction service.
#[async_trait]
pub trait TranscriptExtractor: Send + Sync {
    /// # Errors
    /// Returns `LlmError` when the service fails after retries or the
    /// response violates the schema.
    async fn extract(&self, transcript: &str) -> Result<ExtractionOutcome, LlmError>;

    /// Version tag stored with every extraction.
    fn version(&self) -> &str;
}

/// Extraction engine backed by a chat completion model.
#[derive(Debug)]
pub struct ExtractionEngine {
    client: LlmClient,
    max_transcript_chars: usize,
}

impl ExtractionEngine {
    #[must_use]
    pub fn new(client: LlmClient, settings: &PipelineSettings) -> Self {
        Self { client, max_transcript_chars: settings.max_transcript_chars }
    }

    fn build_request(&self, transcript: &str) -> ChatRequest {
        ChatRequest {
            model: self.client.model().to_owned(),
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!("Transcript:\n{transcript}")),
            ],
            response_format: ResponseFormat::json_object(),
            temperature: Some(0.0),
        }
    }
}

#[async_trait]
impl TranscriptExtractor for ExtractionEngine {
    async fn extract(&self, transcript: &str) -> Result<ExtractionOutcome, LlmError> {
        if transcript.trim().is_empty() {
            tracing::debug!("Blank transcript, skipping extraction");
            return Ok(ExtractionOutcome::Skipped);
        }

        let bounded = truncate_transcript(transcript, self.max_transcript_chars);
        if matches!(bounded, Cow::Owned(_)) {
            tracing::info!(
                original_chars = transcript.chars().count(),
                max_chars = self.max_transcript_chars,
                "Transcript truncated to head and tail"
            );
        }

        let request = self.build_request(&bounded);
        let raw_payload = self.client.chat_completion(&request).await?;
        let fields = parse_extraction(&raw_payload)?;
        Ok(ExtractionOutcome::Extracted { fields, raw_payload })
    }

    fn version(&self) -> &str {
        EXTRACTION_VERSION
    }
}

/// Keep the opening and closing of an over-long transcript, dropping the middle.
///
/// The result never exceeds `max_chars` characters.
#[must_use]
pub fn truncate_transcript(transcript: &str, max_chars: usize) -> Cow<'_, str> {
    let total = transcript.chars().count();
    if total <= max_chars {
        return Cow::Borrowed(transcript);
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return Cow::Owned(transcript.chars().take(max_chars).collect());
    }

    let budget = max_chars.saturating_sub(marker_len);
    let head_chars = budget / 2;
    let tail_chars = budget.saturating_sub(head_chars);
    let head = transcript.get(..byte_offset(transcript, head_chars)).unwrap_or_default();
    let tail = transcript
        .get(byte_offset(transcript, total.saturating_sub(tail_chars))..)
        .unwrap_or_default();
    Cow::Owned(format!("{head}{TRUNCATION_MARKER}{tail}"))
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(idx, _)| idx)
}

/// Parse model output into the extraction schema.
///
/// First tries the whole response (minus a markdown fence), then the first
/// balanced `{...}` found in it.
///
/// # Errors
/// Returns `LlmError::SchemaViolation` when neither pass yields a valid document.
pub fn parse_extraction(content: &str) -> Result<ExtractedLead, LlmError> {
    let document = match serde_json::from_str::<ExtractedLead>(strip_markdown_json(content)) {
        Ok(document) => document,
        Err(direct_err) => {
            let candidate = first_json_object(content).ok_or_else(|| {
                LlmError::SchemaViolation(format!(
                    "no JSON object in response ({direct_err}): {}",
                    truncate(content, 200)
                ))
            })?;
            tracing::debug!(error = %direct_err, "Direct parse failed, using embedded JSON object");
            serde_json::from_str(candidate).map_err(|e| {
                LlmError::SchemaViolation(format!("{e} (content: {})", truncate(candidate, 200)))
            })?
        },
    };
    document.validate().map_err(|e| LlmError::SchemaViolation(e.to_string()))?;
    Ok(document)
}
