//! HTTP ingress for leadflow.
//!
//! Webhook endpoints for the CRM, the voice processor and the workflow
//! automation, plus the workflow status read endpoint the orchestrator polls.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_copy_implementations, reason = "Types may grow")]
#![allow(clippy::ref_patterns, reason = "Ref patterns are clearer")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::shadow_reuse, reason = "Shadowing for Arc clones is idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]
#![allow(clippy::single_call_fn, reason = "Helper functions improve readability")]

pub mod api_error;
mod handlers;
pub mod payloads;
mod response_types;
pub mod signature;

#[cfg(test)]
mod router_tests;

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use leadflow_core::Region;
use leadflow_service::{EventLogService, ReconciliationCoordinator};
use leadflow_storage::StorageBackend;

pub use response_types::VersionResponse;
pub use signature::{SignatureCheck, SignatureVerifier, VOICE_SIGNATURE_HEADER};

/// Shared application state for all HTTP handlers.
pub struct AppState {
    /// Sequences identity, extraction and workflow writes per event
    pub coordinator: Arc<ReconciliationCoordinator>,
    /// Non-critical audit log of every accepted delivery
    pub event_log: EventLogService,
    /// HMAC check for the voice processor's webhooks
    pub voice_verifier: SignatureVerifier,
}

impl AppState {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        coordinator: Arc<ReconciliationCoordinator>,
        voice_verifier: SignatureVerifier,
    ) -> Self {
        Self { coordinator, event_log: EventLogService::new(storage), voice_verifier }
    }

    fn region(&self) -> Region {
        self.coordinator.settings().default_region
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route("/webhooks/crm", post(handlers::webhooks::crm_webhook))
        .route("/webhooks/voice", post(handlers::webhooks::voice_webhook))
        .route("/webhooks/workflow", post(handlers::webhooks::workflow_callback))
        .route(
            "/api/workflows/{execution_id}",
            get(handlers::workflows::get_workflow_execution),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
