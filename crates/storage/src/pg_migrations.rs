//! PostgreSQL schema migrations for leadflow storage.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS leads (
        id TEXT PRIMARY KEY,
        phone_e164 TEXT UNIQUE,
        phone_raw TEXT,
        first_name TEXT,
        last_name TEXT,
        email TEXT,
        source TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'new',
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_leads_email ON leads (email)",
    "CREATE TABLE IF NOT EXISTS phone_mappings (
        phone_e164 TEXT PRIMARY KEY,
        lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
        display_name TEXT,
        last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_phone_mappings_lead ON phone_mappings (lead_id)",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        lead_id TEXT REFERENCES leads(id) ON DELETE CASCADE,
        external_call_id TEXT NOT NULL UNIQUE,
        transcript TEXT,
        duration_secs BIGINT,
        sentiment_score DOUBLE PRECISION,
        extraction_status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_lead ON conversations (lead_id)",
    "CREATE TABLE IF NOT EXISTS extractions (
        conversation_id TEXT PRIMARY KEY REFERENCES conversations(id) ON DELETE CASCADE,
        lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
        fields JSONB NOT NULL,
        extraction_version TEXT NOT NULL,
        raw_extraction_payload TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS ai_profiles (
        lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
        conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        temperature TEXT,
        property_type TEXT,
        loan_type TEXT,
        price_range TEXT,
        timeline TEXT,
        pre_approval_status TEXT,
        concerns JSONB NOT NULL DEFAULT '[]',
        interested_in JSONB NOT NULL DEFAULT '[]',
        requested_actions JSONB NOT NULL DEFAULT '[]',
        summary TEXT,
        completeness_score DOUBLE PRECISION NOT NULL DEFAULT 0,
        confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0,
        extraction_version TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (lead_id, conversation_id)
    )",
    "CREATE TABLE IF NOT EXISTS workflow_executions (
        execution_id TEXT PRIMARY KEY,
        workflow_name TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        error_message TEXT,
        output_data JSONB,
        started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS webhook_events (
        id BIGSERIAL PRIMARY KEY,
        provider TEXT NOT NULL,
        external_event_id TEXT NOT NULL,
        raw_payload TEXT NOT NULL,
        received_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (provider, external_event_id)
    )",
];

/// Run all PostgreSQL migrations.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("PostgreSQL migrations completed");
    Ok(())
}
