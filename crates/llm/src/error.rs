//! Typed error enum for the LLM crate.

use std::time::Duration;

use thiserror::Error;

/// Errors from LLM API operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("empty response: no choices returned")]
    EmptyResponse,
    /// The response did not match the extraction schema, even after the fallback parse.
    #[error("extraction schema violation: {0}")]
    SchemaViolation(String),
    #[error("client initialization failed: {0}")]
    ClientInit(String),
    #[error("all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
    #[error("retry budget of {budget:?} exceeded, last error: {last}")]
    DeadlineExceeded { budget: Duration, last: Box<LlmError> },
}

impl LlmError {
    /// Whether this error is transient and should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatus { code, .. } => matches!(code, 408 | 429 | 500 | 502 | 503 | 504 | 529),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_gateway_errors_are_transient() {
        for code in [429_u16, 503, 504] {
            assert!(LlmError::HttpStatus { code, body: String::new() }.is_transient());
        }
        assert!(!LlmError::HttpStatus { code: 401, body: String::new() }.is_transient());
        assert!(!LlmError::SchemaViolation("x".to_owned()).is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
    }
}
