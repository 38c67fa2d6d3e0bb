//! Storage layer for leadflow
//!
//! Async store traits over leads, phone mappings, conversations, extractions,
//! AI profiles, workflow executions and the webhook event log. Two backends:
//! `SQLite` (rusqlite + r2d2, driven through `spawn_blocking`) and
//! `PostgreSQL` (sqlx). Identity-establishing writes are expressed as
//! conflict-guarded inserts against the unique phone constraint.

pub mod backend;
pub mod error;
#[cfg(feature = "sqlite")]
mod migrations;
#[cfg(feature = "postgres")]
mod pg_migrations;
#[cfg(feature = "postgres")]
mod pg_storage;
#[cfg(feature = "sqlite")]
mod sqlite_async;
#[cfg(feature = "sqlite")]
mod storage;
#[cfg(all(test, feature = "sqlite"))]
mod tests;
pub mod traits;
mod types;

pub use backend::StorageBackend;
pub use error::StorageError;
#[cfg(feature = "postgres")]
pub use pg_storage::PgStorage;
#[cfg(feature = "sqlite")]
pub use storage::Storage;
pub use types::{ConversationUpsert, LeadInsert, LeadMerge};
