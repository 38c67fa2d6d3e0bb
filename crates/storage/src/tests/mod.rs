//! Test utilities and module declarations for storage tests.

use chrono::Utc;
use leadflow_core::{
    normalize_phone, Conversation, ConversationInput, Lead, LeadFacts, Region, SourceTrust,
};
use tempfile::TempDir;

use crate::Storage;

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_test_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = Storage::new(&db_path).unwrap();
    (storage, temp_dir)
}

pub fn create_test_lead(id: &str, phone: Option<&str>, name: Option<&str>) -> Lead {
    let facts = LeadFacts::new("crm", SourceTrust::Verified)
        .phone(phone.map(|p| normalize_phone(p, Region::Us)))
        .full_name(name);
    Lead::from_facts(id.to_owned(), &facts, Utc::now())
}

pub fn create_test_conversation(id: &str, call_id: &str, transcript: Option<&str>) -> Conversation {
    ConversationInput {
        external_call_id: call_id.to_owned(),
        transcript: transcript.map(ToOwned::to_owned),
        duration_secs: Some(120),
        sentiment_score: None,
    }
    .into_conversation(id.to_owned(), Utc::now())
}

mod conversation_tests;
mod lead_tests;
mod workflow_tests;

#[test]
#[expect(clippy::unwrap_used, reason = "test code")]
fn reopening_database_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("reopen.db");
    {
        let storage = Storage::new(&db_path).unwrap();
        storage.insert_lead(&create_test_lead("lead-1", Some("5551234567"), None)).unwrap();
    }
    let storage = Storage::new(&db_path).unwrap();
    assert_eq!(storage.count_leads().unwrap(), 1);
}
