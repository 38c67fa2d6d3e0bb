mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use leadflow_core::env_non_empty;
use leadflow_storage::StorageBackend;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Inbound webhook reconciliation for lead management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Print the canonical form of a phone number
    NormalizePhone {
        raw: String,
        /// ISO 3166 alpha-2 region for national-format numbers
        #[arg(short, long)]
        region: Option<String>,
    },
    /// Print a stored workflow execution as JSON
    WorkflowStatus { execution_id: String },
    /// Apply schema migrations and exit
    Migrate,
}

pub(crate) fn get_db_path() -> PathBuf {
    env_non_empty("LEADFLOW_DB_PATH").map(PathBuf::from).unwrap_or_else(|| {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("leadflow").join("leadflow.db")
    })
}

pub(crate) fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) fn required_env(var: &str) -> Result<String> {
    env_non_empty(var).ok_or_else(|| anyhow::anyhow!("{var} environment variable must be set"))
}

pub(crate) fn get_llm_url() -> String {
    env_non_empty("LEADFLOW_LLM_URL").unwrap_or_else(|| "https://api.openai.com".to_owned())
}

/// PostgreSQL when `LEADFLOW_DATABASE_URL` is set and compiled in, SQLite otherwise.
pub(crate) async fn open_storage() -> Result<StorageBackend> {
    #[cfg(feature = "postgres")]
    if let Some(url) = env_non_empty("LEADFLOW_DATABASE_URL") {
        let backend = StorageBackend::new_postgres(&url).await?;
        tracing::info!("Connected to PostgreSQL");
        return Ok(backend);
    }
    #[cfg(not(feature = "postgres"))]
    if env_non_empty("LEADFLOW_DATABASE_URL").is_some() {
        tracing::warn!("LEADFLOW_DATABASE_URL set but postgres support not compiled in, using SQLite");
    }

    let db_path = get_db_path();
    ensure_db_dir(&db_path)?;
    let backend = StorageBackend::new_sqlite(&db_path)?;
    tracing::info!(path = %db_path.display(), "Opened SQLite database");
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await,
        Commands::NormalizePhone { raw, region } => {
            commands::inspect::normalize(&raw, region.as_deref())
        },
        Commands::WorkflowStatus { execution_id } => {
            commands::inspect::workflow_status(&execution_id).await
        },
        Commands::Migrate => commands::migrate::run().await,
    }
}
