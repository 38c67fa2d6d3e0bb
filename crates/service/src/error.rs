//! Typed error enum for the service layer.
//!
//! Unifies storage and extraction failures into a single error type so the
//! HTTP layer can map each failure mode to a status code without downcasting.

use leadflow_core::CoreError;
use leadflow_llm::LlmError;
use leadflow_storage::StorageError;
use thiserror::Error;

/// Service-layer error unifying storage, extraction and validation failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, not found, duplicate, etc.).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Payload is malformed or lacks identifying fields.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Extraction exhausted its retries or returned a document that
    /// does not match the schema. The conversation is marked `failed`.
    #[error("extraction failed for conversation {conversation_id}: {source}")]
    ExtractionFailed {
        conversation_id: String,
        #[source]
        source: LlmError,
    },
}

impl ServiceError {
    /// Whether the caller sent something unusable.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failure_names_the_conversation() {
        let err = ServiceError::ExtractionFailed {
            conversation_id: "conv-1".to_owned(),
            source: LlmError::RetriesExhausted {
                attempts: 4,
                last: Box::new(LlmError::HttpStatus { code: 503, body: String::new() }),
            },
        };
        assert!(err.to_string().contains("conv-1"));
        assert!(!err.is_validation());
    }

    #[test]
    fn core_errors_become_validation() {
        let err = ServiceError::from(CoreError::InvalidValue {
            kind: "workflow status",
            value: "paused".to_owned(),
        });
        assert!(err.is_validation());
        assert!(err.to_string().contains("paused"));
    }
}
