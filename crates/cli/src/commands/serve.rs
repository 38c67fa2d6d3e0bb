use anyhow::Result;
use leadflow_core::PipelineSettings;
use leadflow_http::{create_router, AppState, SignatureVerifier};
use leadflow_llm::{ExtractionEngine, LlmClient, RetryPolicy};
use leadflow_service::ReconciliationCoordinator;
use std::sync::Arc;

use crate::{get_llm_url, open_storage, required_env};

pub(crate) async fn run(port: u16, host: String) -> Result<()> {
    let api_key = required_env("LEADFLOW_LLM_API_KEY")?;
    let secret = required_env("LEADFLOW_VOICE_WEBHOOK_SECRET")?;
    let verifier = SignatureVerifier::new(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid voice webhook secret: {e}"))?;

    let settings = PipelineSettings::from_env();
    let storage = Arc::new(open_storage().await?);

    let client = LlmClient::new(api_key, get_llm_url())?
        .with_retry_policy(RetryPolicy::from_settings(&settings));
    tracing::info!(model = client.model(), url = client.base_url(), "Extraction client ready");
    let extractor = Arc::new(ExtractionEngine::new(client, &settings));

    let coordinator =
        Arc::new(ReconciliationCoordinator::new(Arc::clone(&storage), extractor, settings));
    let state = Arc::new(AppState::new(storage, coordinator, verifier));

    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
