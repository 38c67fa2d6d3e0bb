//! Service layer for leadflow
//!
//! Centralizes the reconciliation pipeline between the HTTP handlers and
//! storage/llm: identity resolution, the event log, workflow status
//! tracking and the coordinator that sequences them.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(clippy::ref_patterns, reason = "Ref patterns are clearer in some contexts")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::manual_let_else, reason = "if let is clearer")]
#![allow(clippy::let_underscore_untyped, reason = "Type is clear from context")]
#![allow(clippy::let_underscore_must_use, reason = "Intentionally ignoring results")]
#![allow(let_underscore_drop, reason = "Intentionally dropping values")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::cognitive_complexity, reason = "Complex async flows are inherent")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod error;
mod event_log;
mod identity;
mod reconciliation;
mod side_effects;
mod workflow_tracker;

pub use error::ServiceError;
pub use event_log::{event_key, EventLogService};
pub use identity::{IdentityResolver, ResolveAction, ResolvedLead};
pub use reconciliation::{
    CallbackInput, ExecutionRef, PostCallInput, ReconciliationCoordinator, ReconciliationReport,
};
pub use side_effects::best_effort;
pub use workflow_tracker::WorkflowTracker;
