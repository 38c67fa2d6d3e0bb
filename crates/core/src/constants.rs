//! Shared constants for leadflow.

/// Scalar extraction fields at or below this confidence are dropped.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Version tag written alongside every extraction and profile row.
pub const EXTRACTION_VERSION: &str = "lead-extract-v1";

/// Default transcript budget (characters) sent to the extraction service.
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 12_000;

/// Region assumed for phone numbers written without a country code.
pub const DEFAULT_REGION: &str = "US";

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Raw payloads larger than this are truncated before landing in the event log.
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 256 * 1024;
