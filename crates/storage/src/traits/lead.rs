use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadflow_core::{Lead, LeadFacts, PhoneMapping};

use crate::error::StorageError;
use crate::types::{LeadInsert, LeadMerge};

/// Lead and phone-mapping operations.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Get lead by ID.
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StorageError>;

    /// Get the lead owning a canonical phone, reading the leads table directly.
    async fn get_lead_by_phone(&self, phone_e164: &str) -> Result<Option<Lead>, StorageError>;

    /// Exact-match lookup in the phone mapping index.
    async fn get_phone_mapping(&self, phone_e164: &str)
    -> Result<Option<PhoneMapping>, StorageError>;

    /// Insert or repoint a phone mapping row.
    async fn upsert_phone_mapping(&self, mapping: &PhoneMapping) -> Result<(), StorageError>;

    /// Insert a lead and, when it has a canonical phone, its mapping, atomically.
    ///
    /// A uniqueness conflict on `phone_e164` is not an error: the existing
    /// row is returned as `LeadInsert::Conflict`.
    async fn insert_lead(&self, lead: &Lead) -> Result<LeadInsert, StorageError>;

    /// Run the merge policy for `facts` against the row as locked inside the
    /// write transaction, so a concurrent higher-trust write is never undone.
    /// Refreshes the mapping display name. `None` if the lead does not exist.
    async fn merge_lead_facts(
        &self,
        id: &str,
        facts: &LeadFacts,
        now: DateTime<Utc>,
    ) -> Result<Option<LeadMerge>, StorageError>;

    /// Number of lead rows.
    async fn count_leads(&self) -> Result<usize, StorageError>;

    /// Number of phone mapping rows.
    async fn count_phone_mappings(&self) -> Result<usize, StorageError>;
}
