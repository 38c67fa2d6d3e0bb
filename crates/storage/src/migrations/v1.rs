//! Migration v1: Initial schema

pub(super) const SQL: &str = "
CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    phone_e164 TEXT UNIQUE,
    phone_raw TEXT,
    first_name TEXT,
    last_name TEXT,
    email TEXT,
    source TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email);

CREATE TABLE IF NOT EXISTS phone_mappings (
    phone_e164 TEXT PRIMARY KEY,
    lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
    display_name TEXT,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_phone_mappings_lead ON phone_mappings(lead_id);

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    lead_id TEXT REFERENCES leads(id) ON DELETE CASCADE,
    external_call_id TEXT NOT NULL UNIQUE,
    transcript TEXT,
    duration_secs INTEGER,
    sentiment_score REAL,
    extraction_status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_lead ON conversations(lead_id);

CREATE TABLE IF NOT EXISTS extractions (
    conversation_id TEXT PRIMARY KEY REFERENCES conversations(id) ON DELETE CASCADE,
    lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
    fields TEXT NOT NULL,
    extraction_version TEXT NOT NULL,
    raw_extraction_payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ai_profiles (
    lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    temperature TEXT,
    property_type TEXT,
    loan_type TEXT,
    price_range TEXT,
    timeline TEXT,
    pre_approval_status TEXT,
    concerns TEXT NOT NULL DEFAULT '[]',
    interested_in TEXT NOT NULL DEFAULT '[]',
    requested_actions TEXT NOT NULL DEFAULT '[]',
    summary TEXT,
    completeness_score REAL NOT NULL DEFAULT 0,
    confidence_score REAL NOT NULL DEFAULT 0,
    extraction_version TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (lead_id, conversation_id)
);

CREATE TABLE IF NOT EXISTS workflow_executions (
    execution_id TEXT PRIMARY KEY,
    workflow_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    output_data TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS webhook_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    external_event_id TEXT NOT NULL,
    raw_payload TEXT NOT NULL,
    received_at TEXT NOT NULL,
    UNIQUE (provider, external_event_id)
);
";
