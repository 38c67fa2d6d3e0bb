#![allow(clippy::unwrap_used, reason = "test code")]

use leadflow_core::ExtractionStatus;

use super::{create_test_conversation, create_test_lead, create_test_storage};
use crate::StorageError;

#[test]
fn upsert_creates_then_refreshes_without_clearing() {
    let (storage, _dir) = create_test_storage();

    let first = storage
        .upsert_conversation(&create_test_conversation("conv-1", "call-1", Some("Hi there")))
        .unwrap();
    assert!(first.created);
    assert_eq!(first.conversation.extraction_status, ExtractionStatus::Pending);

    let mut replay = create_test_conversation("conv-2", "call-1", None);
    replay.duration_secs = Some(300);
    let second = storage.upsert_conversation(&replay).unwrap();

    assert!(!second.created);
    assert_eq!(second.conversation.id, "conv-1");
    assert_eq!(second.conversation.transcript.as_deref(), Some("Hi there"));
    assert_eq!(second.conversation.duration_secs, Some(300));
    assert!(storage.get_conversation("conv-2").unwrap().is_none());
}

#[test]
fn blank_transcript_is_stored_as_absent() {
    let (storage, _dir) = create_test_storage();
    let upsert = storage
        .upsert_conversation(&create_test_conversation("conv-1", "call-1", Some("   ")))
        .unwrap();
    assert!(upsert.conversation.transcript.is_none());
}

#[test]
fn linked_conversation_is_never_moved() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-a", Some("5551234567"), None)).unwrap();
    storage.insert_lead(&create_test_lead("lead-b", Some("5559876543"), None)).unwrap();
    storage.upsert_conversation(&create_test_conversation("conv-1", "call-1", None)).unwrap();

    let owner = storage.link_conversation("conv-1", "lead-a").unwrap();
    assert_eq!(owner.as_deref(), Some("lead-a"));

    let owner = storage.link_conversation("conv-1", "lead-b").unwrap();
    assert_eq!(owner.as_deref(), Some("lead-a"));

    let mut replay = create_test_conversation("conv-x", "call-1", None);
    replay.lead_id = Some("lead-b".to_owned());
    let upsert = storage.upsert_conversation(&replay).unwrap();
    assert_eq!(upsert.conversation.lead_id.as_deref(), Some("lead-a"));

    assert_eq!(storage.get_lead_conversations("lead-a").unwrap().len(), 1);
    assert!(storage.get_lead_conversations("lead-b").unwrap().is_empty());
}

#[test]
fn link_missing_conversation_returns_none() {
    let (storage, _dir) = create_test_storage();
    storage.insert_lead(&create_test_lead("lead-a", Some("5551234567"), None)).unwrap();
    assert!(storage.link_conversation("missing", "lead-a").unwrap().is_none());
}

#[test]
fn extraction_status_updates_and_reports_missing_rows() {
    let (storage, _dir) = create_test_storage();
    storage.upsert_conversation(&create_test_conversation("conv-1", "call-1", None)).unwrap();

    storage.set_extraction_status("conv-1", ExtractionStatus::Failed).unwrap();
    let stored = storage.get_conversation_by_external_id("call-1").unwrap().unwrap();
    assert_eq!(stored.extraction_status, ExtractionStatus::Failed);

    let err = storage.set_extraction_status("missing", ExtractionStatus::Done).unwrap_err();
    assert!(matches!(err, StorageError::NotFound { entity: "conversation", .. }));
}
