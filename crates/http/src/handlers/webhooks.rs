use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use leadflow_core::Provider;
use leadflow_service::ReconciliationReport;

use crate::api_error::ApiError;
use crate::payloads::{
    peek_callback_execution, peek_event_id, CrmWebhook, VoiceWebhook, WorkflowCallback,
};
use crate::response_types::{ContactResponse, EventLogStatus, ReconciliationResponse};
use crate::signature::VOICE_SIGNATURE_HEADER;
use crate::AppState;

/// Parse the body loosely and write the audit record before typed validation,
/// so a rejected payload still leaves a trace.
async fn log_event(
    state: &AppState,
    provider: Provider,
    body: &Bytes,
) -> Result<(serde_json::Value, EventLogStatus), ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let record = state.event_log.record(provider, peek_event_id(&value), body).await;
    Ok((value, record.into()))
}

pub async fn crm_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ContactResponse>, ApiError> {
    let (value, event) = log_event(&state, Provider::Crm, &body).await?;
    let hook: CrmWebhook = serde_json::from_value(value)?;
    let facts = hook.lead_facts(state.region()).map_err(ApiError::BadRequest)?;

    let resolved = state.coordinator.reconcile_contact(&facts).await?;
    tracing::info!(
        lead_id = %resolved.lead.id,
        event_type = ?hook.event_type,
        action = ?resolved.action,
        "CRM contact reconciled"
    );
    Ok(Json(ContactResponse::new(event, &resolved)))
}

pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let signature = headers.get(VOICE_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let check = state.voice_verifier.verify(&body, signature);
    if !check.is_valid() {
        tracing::warn!(reason = check.as_str(), "Rejected voice webhook");
        return Err(ApiError::Unauthorized(check.as_str().to_owned()));
    }

    let (value, event) = log_event(&state, Provider::Voice, &body).await?;
    let report = match serde_json::from_value::<VoiceWebhook>(value)? {
        VoiceWebhook::CallStarted(started) => {
            let (caller, conversation) =
                started.into_parts(state.region()).map_err(ApiError::BadRequest)?;
            state.coordinator.record_call_started(&caller, conversation).await?
        },
        VoiceWebhook::PostCallTranscription(post) => {
            let input = post.into_input(state.region()).map_err(ApiError::BadRequest)?;
            state.coordinator.handle_post_call(input).await?
        },
    };
    Ok(Json(ReconciliationResponse::new(event, report)))
}

/// Always 200 with a summary unless the body is not JSON or an internal
/// fault occurs. Invalid payloads and rejected fragments are reported inside
/// the summary, and fail the execution when the body names one.
pub async fn workflow_callback(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let (value, event) = log_event(&state, Provider::Workflow, &body).await?;
    let execution = peek_callback_execution(&value);
    let parsed = serde_json::from_value::<WorkflowCallback>(value)
        .map_err(|e| format!("invalid payload: {e}"))
        .and_then(|callback| callback.into_input(state.region()));

    let report = match (parsed, execution) {
        (Ok(input), _) => state.coordinator.handle_callback(input).await?,
        (Err(message), Some(execution)) => {
            state.coordinator.reject_callback(&execution, message).await?
        },
        (Err(message), None) => {
            tracing::warn!(error = %message, "Workflow callback names no execution, nothing recorded");
            ReconciliationReport { error: Some(message), ..ReconciliationReport::default() }
        },
    };
    Ok(Json(ReconciliationResponse::new(event, report)))
}
