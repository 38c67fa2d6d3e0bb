#![allow(clippy::unwrap_used, reason = "test code")]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use leadflow_core::{ExtractedLead, PipelineSettings, Provider, ScoredField, EXTRACTION_VERSION};
use leadflow_llm::{ExtractionOutcome, LlmError, TranscriptExtractor};
use leadflow_service::ReconciliationCoordinator;
use leadflow_storage::traits::{EventLogStore, LeadStore};
use leadflow_storage::StorageBackend;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{create_router, AppState, SignatureVerifier, VOICE_SIGNATURE_HEADER};

const SECRET: &str = "voice-secret";

struct FixedExtractor {
    fail: bool,
}

#[async_trait]
impl TranscriptExtractor for FixedExtractor {
    async fn extract(&self, transcript: &str) -> Result<ExtractionOutcome, LlmError> {
        if transcript.trim().is_empty() {
            return Ok(ExtractionOutcome::Skipped);
        }
        if self.fail {
            return Err(LlmError::RetriesExhausted {
                attempts: 4,
                last: Box::new(LlmError::HttpStatus { code: 503, body: String::new() }),
            });
        }
        let fields = ExtractedLead {
            property_type: ScoredField::new("single family".to_owned(), 0.8),
            ..ExtractedLead::default()
        };
        Ok(ExtractionOutcome::Extracted { fields, raw_payload: "{}".to_owned() })
    }

    fn version(&self) -> &str {
        EXTRACTION_VERSION
    }
}

struct Harness {
    router: Router,
    storage: Arc<StorageBackend>,
    _dir: TempDir,
}

fn harness(fail_extraction: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(StorageBackend::new_sqlite(&dir.path().join("http.db")).unwrap());
    let coordinator = Arc::new(ReconciliationCoordinator::new(
        Arc::clone(&storage),
        Arc::new(FixedExtractor { fail: fail_extraction }),
        PipelineSettings::default(),
    ));
    let verifier = SignatureVerifier::new(SECRET.as_bytes()).unwrap();
    let state = Arc::new(AppState::new(Arc::clone(&storage), coordinator, verifier));
    Harness { router: create_router(state), storage, _dir: dir }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn signed_voice(body: &str, signature: &str) -> Request<Body> {
    Request::post("/webhooks/voice")
        .header("content-type", "application/json")
        .header(VOICE_SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn sign(body: &str) -> String {
    SignatureVerifier::new(SECRET.as_bytes()).unwrap().sign(body.as_bytes())
}

fn post_call_body() -> String {
    json!({
        "type": "post_call_transcription",
        "event_id": "evt-voice-1",
        "call_id": "call-1",
        "caller_number": "+15551234567",
        "transcript": [{"role": "user", "message": "Looking for a house"}],
        "execution_id": "exec-1"
    })
    .to_string()
}

#[tokio::test]
async fn crm_contact_creates_lead() {
    let h = harness(false);
    let body = json!({
        "event_id": "crm-1",
        "type": "contact.created",
        "contact": {"phone": "(555) 123-4567", "name": "John Smith"}
    });
    let (status, json) = send(&h.router, post("/webhooks/crm", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lead_action"], "created");
    assert_eq!(json["event"], "recorded");
    let lead = h.storage.get_lead_by_phone("+15551234567").await.unwrap().unwrap();
    assert_eq!(lead.source, "CRM");
    assert_eq!(lead.first_name.as_deref(), Some("John"));
}

#[tokio::test]
async fn crm_replay_is_logged_as_duplicate_and_reuses_lead() {
    let h = harness(false);
    let body = json!({"type": "contact.updated", "contact": {"phone": "5551234567"}}).to_string();

    let (_, first) = send(&h.router, post("/webhooks/crm", &body)).await;
    let (status, second) = send(&h.router, post("/webhooks/crm", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["event"], "duplicate");
    assert_eq!(second["lead_action"], "unchanged");
    assert_eq!(first["lead_id"], second["lead_id"]);
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
    let h = harness(false);
    let body = post_call_body();
    let mut signature = sign(&body);
    signature.pop();
    signature.push('0');

    let (status, _) = send(&h.router, signed_voice(&body, &signature)).await;
    let (missing, _) = send(&h.router, post("/webhooks/voice", &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(h.storage.count_events(Some(Provider::Voice)).await.unwrap(), 0);
    assert_eq!(h.storage.count_leads().await.unwrap(), 0);
}

#[tokio::test]
async fn signed_post_call_reconciles_and_exposes_workflow_status() {
    let h = harness(false);
    let body = post_call_body();

    let (status, json) = send(&h.router, signed_voice(&body, &sign(&body))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["extraction_status"], "done");
    assert_eq!(json["workflow_status"], "success");
    assert_eq!(json["profile_upserted"], true);

    let request = Request::get("/api/workflows/exec-1").body(Body::empty()).unwrap();
    let (status, execution) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(execution["status"], "success");
    assert_eq!(execution["output_data"]["lead_id"], json["lead_id"]);
}

#[tokio::test]
async fn extraction_failure_returns_bad_gateway() {
    let h = harness(true);
    let body = post_call_body();

    let (status, _) = send(&h.router, signed_voice(&body, &sign(&body))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let request = Request::get("/api/workflows/exec-1").body(Body::empty()).unwrap();
    let (_, execution) = send(&h.router, request).await;
    assert_eq!(execution["status"], "failed");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = harness(false);
    let (status, json) = send(&h.router, post("/webhooks/workflow", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid payload"));
}

#[tokio::test]
async fn workflow_callback_reports_rejected_fragments_with_ok() {
    let h = harness(false);
    let body = json!({
        "workflow_name": "qualify",
        "execution_id": "wf-7",
        "status": "success",
        "profile": {"temperature": "warm"}
    });
    let (status, json) = send(&h.router, post("/webhooks/workflow", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["workflow_status"], "failed");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn workflow_callback_with_unknown_status_fails_named_execution() {
    let h = harness(false);
    let body = json!({"workflow_name": "qualify", "execution_id": "wf-x", "status": "paused"});
    let (status, json) = send(&h.router, post("/webhooks/workflow", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["workflow_status"], "failed");
    assert!(json["error"].as_str().unwrap().contains("paused"));

    let request = Request::get("/api/workflows/wf-x").body(Body::empty()).unwrap();
    let (status, execution) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(execution["status"], "failed");
    assert_eq!(execution["workflow_name"], "qualify");
}

#[tokio::test]
async fn workflow_callback_with_mistyped_profile_fails_named_execution() {
    let h = harness(false);
    let body = json!({
        "workflow_name": "qualify",
        "execution_id": "wf-y",
        "status": "success",
        "profile": {"temperature": 12}
    });
    let (status, json) = send(&h.router, post("/webhooks/workflow", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["workflow_status"], "failed");
    assert!(json["error"].as_str().unwrap().contains("invalid payload"));
}

#[tokio::test]
async fn workflow_callback_without_execution_id_reports_error() {
    let h = harness(false);
    let body = json!({"workflow_name": "qualify", "status": "paused"});
    let (status, json) = send(&h.router, post("/webhooks/workflow", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["error"].is_string());
    assert!(json["workflow_status"].is_null());
    assert_eq!(json["event"], "recorded");
}

#[tokio::test]
async fn unknown_workflow_execution_is_not_found() {
    let h = harness(false);
    let request = Request::get("/api/workflows/nope").body(Body::empty()).unwrap();
    let (status, _) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_version() {
    let h = harness(false);
    let response =
        h.router.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, json) =
        send(&h.router, Request::get("/api/version").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
