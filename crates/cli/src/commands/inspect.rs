use anyhow::Result;
use leadflow_core::{normalize_phone, PipelineSettings, Region};
use leadflow_storage::traits::WorkflowStore;

use crate::open_storage;

pub(crate) fn normalize(raw: &str, region: Option<&str>) -> Result<()> {
    let region = match region {
        Some(code) => {
            Region::from_code(code).ok_or_else(|| anyhow::anyhow!("unknown region: {code}"))?
        },
        None => PipelineSettings::from_env().default_region,
    };
    let phone = normalize_phone(raw, region);
    match phone.e164 {
        Some(e164) => println!("{e164}"),
        None => {
            eprintln!("not a recognizable phone number, stored as-is");
            println!("{}", phone.raw);
        },
    }
    Ok(())
}

pub(crate) async fn workflow_status(execution_id: &str) -> Result<()> {
    let storage = open_storage().await?;
    match storage.get_execution(execution_id).await? {
        Some(execution) => println!("{}", serde_json::to_string_pretty(&execution)?),
        None => anyhow::bail!("workflow execution not found: {execution_id}"),
    }
    Ok(())
}
