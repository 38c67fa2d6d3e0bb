//! LLM client and transcript extraction engine for leadflow
//!
//! Talks to an OpenAI-compatible chat completion endpoint. Every call goes
//! through a bounded [`RetryPolicy`]; the [`ExtractionEngine`] turns a call
//! transcript into a validated [`leadflow_core::ExtractedLead`].

mod ai_types;
pub mod client;
pub mod error;
pub mod extraction;
pub mod retry;


pub use ai_types::{ChatRequest, Message, ResponseFormat};
pub use client::LlmClient;
pub use error::LlmError;
pub use extraction::{
    parse_extraction, truncate_transcript, ExtractionEngine, ExtractionOutcome,
    TranscriptExtractor,
};
pub use retry::RetryPolicy;
