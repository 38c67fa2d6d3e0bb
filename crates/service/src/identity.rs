use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{Lead, LeadFacts, PhoneMapping};
use leadflow_storage::traits::LeadStore;
use leadflow_storage::{LeadInsert, LeadMerge, StorageBackend, StorageError};

use crate::ServiceError;

/// What resolution did to the lead row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLead {
    pub lead: Lead,
    pub action: ResolveAction,
    /// Creation lost a race on the phone constraint and reused the winner.
    pub conflict_resolved: bool,
}

/// Finds or creates the lead behind an inbound event, keyed by canonical phone.
pub struct IdentityResolver {
    storage: Arc<StorageBackend>,
}

impl IdentityResolver {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn resolve(&self, facts: &LeadFacts) -> Result<ResolvedLead, ServiceError> {
        if facts.is_anonymous() {
            return Err(ServiceError::Validation(
                "event carries no phone, name or email".to_owned(),
            ));
        }

        if let Some(phone) = facts.canonical_phone() {
            if let Some(existing) = self.find_by_phone(phone).await? {
                return self.merge(existing, facts, false).await;
            }
        } else {
            tracing::info!(
                source = %facts.source,
                "No canonical phone; creating lead that cannot be deduplicated by phone"
            );
        }

        let candidate = Lead::from_facts(uuid::Uuid::new_v4().to_string(), facts, Utc::now());
        match self.storage.insert_lead(&candidate).await? {
            LeadInsert::Applied(lead) => {
                tracing::info!(lead_id = %lead.id, source = %lead.source, "Created lead");
                Ok(ResolvedLead { lead, action: ResolveAction::Created, conflict_resolved: false })
            },
            LeadInsert::Conflict(existing) => {
                tracing::info!(
                    lead_id = %existing.id,
                    "Concurrent creation for the same phone, using existing lead"
                );
                self.merge(existing, facts, true).await
            },
        }
    }

    /// Mapping first; fall back to the lead table and repair a missing mapping.
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Lead>, ServiceError> {
        if let Some(mapping) = self.storage.get_phone_mapping(phone).await? {
            if let Some(lead) = self.storage.get_lead(&mapping.lead_id).await? {
                return Ok(Some(lead));
            }
            tracing::warn!(lead_id = %mapping.lead_id, "Phone mapping points at a missing lead");
        }

        let Some(lead) = self.storage.get_lead_by_phone(phone).await? else {
            return Ok(None);
        };
        let mapping = PhoneMapping {
            phone_e164: phone.to_owned(),
            lead_id: lead.id.clone(),
            display_name: lead.display_name(),
            last_updated: Utc::now(),
        };
        self.storage.upsert_phone_mapping(&mapping).await?;
        tracing::info!(lead_id = %lead.id, "Repaired missing phone mapping");
        Ok(Some(lead))
    }

    /// Merge extra facts into a lead that is already resolved.
    pub async fn enrich(&self, lead: Lead, facts: &LeadFacts) -> Result<ResolvedLead, ServiceError> {
        self.merge(lead, facts, false).await
    }

    /// `lead` only decides whether a write is needed; the policy is re-run
    /// on the locked row, so a newer verified write is never clobbered.
    async fn merge(
        &self,
        lead: Lead,
        facts: &LeadFacts,
        conflict_resolved: bool,
    ) -> Result<ResolvedLead, ServiceError> {
        if facts.patch_for(&lead).is_empty() {
            return Ok(ResolvedLead { lead, action: ResolveAction::Unchanged, conflict_resolved });
        }
        let merged = self
            .storage
            .merge_lead_facts(&lead.id, facts, Utc::now())
            .await?
            .ok_or_else(|| StorageError::NotFound { entity: "lead", id: lead.id.clone() })?;
        let (lead, action) = match merged {
            LeadMerge::Updated(lead) => {
                tracing::debug!(lead_id = %lead.id, source = %facts.source, "Merged new facts into lead");
                (lead, ResolveAction::Updated)
            },
            LeadMerge::Unchanged(lead) => (lead, ResolveAction::Unchanged),
        };
        Ok(ResolvedLead { lead, action, conflict_resolved })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test code")]

    use leadflow_core::{normalize_phone, Region, SourceTrust};
    use tempfile::TempDir;

    use super::*;

    fn resolver() -> (IdentityResolver, Arc<StorageBackend>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageBackend::new_sqlite(&dir.path().join("id.db")).unwrap());
        (IdentityResolver::new(Arc::clone(&storage)), storage, dir)
    }

    fn facts(phone: &str, name: Option<&str>, trust: SourceTrust) -> LeadFacts {
        LeadFacts::new("CRM", trust)
            .phone(Some(normalize_phone(phone, Region::Us)))
            .full_name(name)
    }

    #[tokio::test]
    async fn crm_contact_creates_lead_with_split_name() {
        let (resolver, _storage, _dir) = resolver();
        let resolved = resolver
            .resolve(&facts("(555) 123-4567", Some("John Smith"), SourceTrust::Verified))
            .await
            .unwrap();

        assert_eq!(resolved.action, ResolveAction::Created);
        assert_eq!(resolved.lead.phone_e164.as_deref(), Some("+15551234567"));
        assert_eq!(resolved.lead.first_name.as_deref(), Some("John"));
        assert_eq!(resolved.lead.last_name.as_deref(), Some("Smith"));
        assert_eq!(resolved.lead.source, "CRM");
    }

    #[tokio::test]
    async fn differently_formatted_phone_resolves_to_same_lead() {
        let (resolver, _storage, _dir) = resolver();
        let first = resolver.resolve(&facts("555.123.4567", None, SourceTrust::Inferred)).await.unwrap();
        let second =
            resolver.resolve(&facts("+1 (555) 123-4567", None, SourceTrust::Inferred)).await.unwrap();
        assert_eq!(first.lead.id, second.lead.id);
        assert_eq!(second.action, ResolveAction::Unchanged);
    }

    #[tokio::test]
    async fn inferred_source_fills_gaps_only() {
        let (resolver, _storage, _dir) = resolver();
        resolver.resolve(&facts("5551234567", Some("John Smith"), SourceTrust::Verified)).await.unwrap();

        let guess = facts("5551234567", Some("Jon Smyth"), SourceTrust::Inferred).email(Some("J@X.COM"));
        let resolved = resolver.resolve(&guess).await.unwrap();

        assert_eq!(resolved.action, ResolveAction::Updated);
        assert_eq!(resolved.lead.first_name.as_deref(), Some("John"));
        assert_eq!(resolved.lead.email.as_deref(), Some("j@x.com"));
    }

    #[tokio::test]
    async fn verified_source_overwrites() {
        let (resolver, storage, _dir) = resolver();
        resolver.resolve(&facts("5551234567", Some("Jon"), SourceTrust::Inferred)).await.unwrap();
        let resolved =
            resolver.resolve(&facts("5551234567", Some("John Smith"), SourceTrust::Verified)).await.unwrap();

        assert_eq!(resolved.lead.first_name.as_deref(), Some("John"));
        let mapping = storage.get_phone_mapping("+15551234567").await.unwrap().unwrap();
        assert_eq!(mapping.display_name.as_deref(), Some("John Smith"));
    }

    #[tokio::test]
    async fn stale_inferred_enrich_does_not_undo_verified_update() {
        let (resolver, storage, _dir) = resolver();
        let nameless = resolver.resolve(&facts("5551234567", None, SourceTrust::Inferred)).await.unwrap();

        resolver.resolve(&facts("5551234567", Some("John Smith"), SourceTrust::Verified)).await.unwrap();
        let guess = LeadFacts::new("voice", SourceTrust::Inferred).full_name(Some("Jon Smyth"));
        let resolved = resolver.enrich(nameless.lead, &guess).await.unwrap();

        assert_eq!(resolved.action, ResolveAction::Unchanged);
        assert_eq!(resolved.lead.first_name.as_deref(), Some("John"));
        let stored = storage.get_lead(&resolved.lead.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("John"));
        assert_eq!(stored.last_name.as_deref(), Some("Smith"));
    }

    #[tokio::test]
    async fn unparseable_phone_still_creates_lead() {
        let (resolver, storage, _dir) = resolver();
        let resolved = resolver.resolve(&facts("call me", Some("Ann"), SourceTrust::Verified)).await.unwrap();

        assert_eq!(resolved.action, ResolveAction::Created);
        assert!(resolved.lead.phone_e164.is_none());
        assert_eq!(resolved.lead.phone_raw.as_deref(), Some("call me"));
        assert_eq!(storage.count_phone_mappings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn anonymous_facts_are_rejected() {
        let (resolver, storage, _dir) = resolver();
        let err = resolver.resolve(&LeadFacts::new("voice", SourceTrust::Inferred)).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.count_leads().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_sightings_create_one_lead() {
        let (resolver, storage, _dir) = resolver();
        let resolver = Arc::new(resolver);

        let mut handles = Vec::new();
        for i in 0..8 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                let name = format!("Caller {i}");
                resolver.resolve(&facts("555-010-2030", Some(&name), SourceTrust::Inferred)).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().lead.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(storage.count_leads().await.unwrap(), 1);
        assert_eq!(storage.count_phone_mappings().await.unwrap(), 1);
    }
}
