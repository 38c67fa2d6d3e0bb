//! Storage backend trait abstraction
//!
//! Async domain traits implemented by every backend, so services can be
//! written once and tested against `SQLite`.

pub mod conversation;
pub mod event_log;
pub mod extraction;
pub mod lead;
pub mod workflow;

pub use conversation::ConversationStore;
pub use event_log::EventLogStore;
pub use extraction::ExtractionStore;
pub use lead::LeadStore;
pub use workflow::WorkflowStore;
