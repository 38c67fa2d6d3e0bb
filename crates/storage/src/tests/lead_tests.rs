#![allow(clippy::unwrap_used, reason = "test code")]

use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{LeadFacts, SourceTrust};

use super::{create_test_lead, create_test_storage};
use crate::traits::LeadStore;
use crate::{LeadInsert, LeadMerge};

#[test]
fn insert_lead_writes_phone_mapping() {
    let (storage, _dir) = create_test_storage();
    let lead = create_test_lead("lead-1", Some("(555) 123-4567"), Some("John Smith"));

    let outcome = storage.insert_lead(&lead).unwrap();
    assert!(matches!(outcome, LeadInsert::Applied(_)));

    let mapping = storage.get_phone_mapping("+15551234567").unwrap().unwrap();
    assert_eq!(mapping.lead_id, "lead-1");
    assert_eq!(mapping.display_name.as_deref(), Some("John Smith"));

    let stored = storage.get_lead_by_phone("+15551234567").unwrap().unwrap();
    assert_eq!(stored.first_name.as_deref(), Some("John"));
    assert_eq!(stored.last_name.as_deref(), Some("Smith"));
    assert_eq!(stored.phone_raw.as_deref(), Some("(555) 123-4567"));
}

#[test]
fn second_insert_for_same_phone_returns_existing_lead() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-1", Some("555-123-4567"), None)).unwrap();

    let outcome =
        storage.insert_lead(&create_test_lead("lead-2", Some("+1 555 123 4567"), None)).unwrap();

    match outcome {
        LeadInsert::Conflict(existing) => assert_eq!(existing.id, "lead-1"),
        LeadInsert::Applied(_) => panic!("expected conflict"),
    }
    assert_eq!(storage.count_leads().unwrap(), 1);
    assert_eq!(storage.count_phone_mappings().unwrap(), 1);
    assert!(storage.get_lead("lead-2").unwrap().is_none());
}

#[test]
fn conflict_repairs_missing_mapping() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-1", Some("5551234567"), Some("Ann"))).unwrap();
    {
        let conn = crate::storage::get_conn(&storage.pool).unwrap();
        conn.execute("DELETE FROM phone_mappings", []).unwrap();
    }

    storage.insert_lead(&create_test_lead("lead-2", Some("5551234567"), None)).unwrap();

    let mapping = storage.get_phone_mapping("+15551234567").unwrap().unwrap();
    assert_eq!(mapping.lead_id, "lead-1");
    assert_eq!(mapping.display_name.as_deref(), Some("Ann"));
}

#[test]
fn leads_without_canonical_phone_never_conflict() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-1", Some("ext. 12"), None)).unwrap();
    storage.insert_lead(&create_test_lead("lead-2", None, Some("Jane"))).unwrap();

    assert_eq!(storage.count_leads().unwrap(), 2);
    assert_eq!(storage.count_phone_mappings().unwrap(), 0);
    let stored = storage.get_lead("lead-1").unwrap().unwrap();
    assert!(stored.phone_e164.is_none());
    assert_eq!(stored.phone_raw.as_deref(), Some("ext. 12"));
}

#[test]
fn merge_lead_facts_fills_gaps_and_display_name() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-1", Some("5551234567"), None)).unwrap();

    let facts = LeadFacts::new("CRM", SourceTrust::Verified)
        .full_name(Some("John Smith"))
        .email(Some("john@example.com"));
    let merged = storage.merge_lead_facts("lead-1", &facts, Utc::now()).unwrap().unwrap();
    let LeadMerge::Updated(updated) = merged else { panic!("expected update") };
    assert_eq!(updated.email.as_deref(), Some("john@example.com"));

    let stored = storage.get_lead("lead-1").unwrap().unwrap();
    assert_eq!(stored.first_name.as_deref(), Some("John"));
    let mapping = storage.get_phone_mapping("+15551234567").unwrap().unwrap();
    assert_eq!(mapping.display_name.as_deref(), Some("John Smith"));
}

#[test]
fn merge_lead_facts_on_missing_lead_returns_none() {
    let (storage, _dir) = create_test_storage();
    let facts = LeadFacts::new("CRM", SourceTrust::Verified).notes(Some("hello"));
    assert!(storage.merge_lead_facts("missing", &facts, Utc::now()).unwrap().is_none());
}

#[test]
fn inferred_merge_after_verified_write_keeps_verified_name() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-1", Some("5551234567"), None)).unwrap();

    // The inferred guess was computed against the nameless row, but a CRM
    // update lands before it is written.
    let stale = storage.get_lead("lead-1").unwrap().unwrap();
    let guess = LeadFacts::new("voice", SourceTrust::Inferred).full_name(Some("Jon Smyth"));
    assert!(!guess.patch_for(&stale).is_empty());

    let verified = LeadFacts::new("CRM", SourceTrust::Verified).full_name(Some("John Smith"));
    storage.merge_lead_facts("lead-1", &verified, Utc::now()).unwrap().unwrap();

    let merged = storage.merge_lead_facts("lead-1", &guess, Utc::now()).unwrap().unwrap();
    assert!(matches!(merged, LeadMerge::Unchanged(_)));
    let stored = storage.get_lead("lead-1").unwrap().unwrap();
    assert_eq!(stored.first_name.as_deref(), Some("John"));
    assert_eq!(stored.last_name.as_deref(), Some("Smith"));
    let mapping = storage.get_phone_mapping("+15551234567").unwrap().unwrap();
    assert_eq!(mapping.display_name.as_deref(), Some("John Smith"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_for_one_phone_create_one_lead() {
    let (storage, _dir) = create_test_storage();
    let storage = Arc::new(storage);

    let mut handles = Vec::new();
    for i in 0..8 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            let lead = create_test_lead(&format!("lead-{i}"), Some("555.123.4567"), None);
            LeadStore::insert_lead(storage.as_ref(), &lead).await
        }));
    }

    let mut applied = 0;
    let mut owners = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if matches!(outcome, LeadInsert::Applied(_)) {
            applied += 1;
        }
        owners.push(outcome.into_lead().id);
    }

    assert_eq!(applied, 1);
    owners.dedup();
    assert_eq!(owners.len(), 1, "every caller must observe the same lead");
    assert_eq!(LeadStore::count_leads(storage.as_ref()).await.unwrap(), 1);
    assert_eq!(LeadStore::count_phone_mappings(storage.as_ref()).await.unwrap(), 1);
}
