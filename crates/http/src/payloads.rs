//! Provider payloads, validated at the boundary and converted straight into
//! service inputs. Nothing untyped travels past this module.

use leadflow_core::{
    normalize_phone, render_transcript, ConversationInput, LeadFacts, ProfileInput, Region,
    SourceTrust, TranscriptTurn, WorkflowStatus,
};
use leadflow_service::{CallbackInput, ExecutionRef, PostCallInput};
use serde::Deserialize;

/// Source tag written on leads first seen in the CRM.
pub const CRM_SOURCE: &str = "CRM";
/// Source tag written on leads first seen on a call.
pub const VOICE_SOURCE: &str = "voice";
/// Source tag written on leads first seen in a workflow callback.
pub const WORKFLOW_SOURCE: &str = "workflow";

/// Event id a provider put at the top level of its body, if any.
#[must_use]
pub fn peek_event_id(value: &serde_json::Value) -> Option<&str> {
    ["event_id", "id"].iter().find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
}

/// Execution a callback body names, read before typed validation so an
/// unusable payload can still be charged to its run.
#[must_use]
pub fn peek_callback_execution(value: &serde_json::Value) -> Option<ExecutionRef> {
    let execution_id = value
        .get("execution_id")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?;
    let workflow_name = value
        .get("workflow_name")
        .and_then(serde_json::Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(WORKFLOW_SOURCE);
    Some(ExecutionRef {
        execution_id: execution_id.to_owned(),
        workflow_name: workflow_name.to_owned(),
    })
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum CrmEventType {
    #[serde(rename = "contact.created")]
    ContactCreated,
    #[serde(rename = "contact.updated")]
    ContactUpdated,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrmContact {
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(alias = "full_name")]
    pub name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Contact created/updated in the CRM.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmWebhook {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: CrmEventType,
    pub contact: CrmContact,
}

impl CrmWebhook {
    /// # Errors
    /// Returns a message when the contact carries nothing identifying.
    pub fn lead_facts(&self, region: Region) -> Result<LeadFacts, String> {
        let c = &self.contact;
        let facts = LeadFacts::new(CRM_SOURCE, SourceTrust::Verified)
            .phone(c.phone.as_deref().map(|p| normalize_phone(p, region)))
            .first_name(c.first_name.as_deref())
            .last_name(c.last_name.as_deref())
            .full_name(c.name.as_deref())
            .email(c.email.as_deref())
            .notes(c.notes.as_deref());
        if facts.is_anonymous() {
            return Err("contact has no phone, name or email".to_owned());
        }
        Ok(facts)
    }
}

/// Transcript sent either as turns or as pre-rendered text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TranscriptBody {
    Turns(Vec<TranscriptTurn>),
    Text(String),
}

impl TranscriptBody {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Turns(turns) => render_transcript(turns),
            Self::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallStarted {
    #[serde(default)]
    pub event_id: Option<String>,
    pub call_id: String,
    pub caller_number: Option<String>,
    pub caller_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostCallTranscription {
    #[serde(default)]
    pub event_id: Option<String>,
    pub call_id: String,
    pub caller_number: Option<String>,
    pub caller_name: Option<String>,
    pub transcript: Option<TranscriptBody>,
    pub duration_secs: Option<i64>,
    pub sentiment_score: Option<f64>,
    pub execution_id: Option<String>,
    pub workflow_name: Option<String>,
}

/// Voice processor events, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceWebhook {
    CallStarted(CallStarted),
    PostCallTranscription(PostCallTranscription),
}

fn caller_facts(number: Option<&str>, name: Option<&str>, region: Region) -> LeadFacts {
    LeadFacts::new(VOICE_SOURCE, SourceTrust::Inferred)
        .phone(number.map(|n| normalize_phone(n, region)))
        .full_name(name)
}

fn require_call_id(call_id: &str) -> Result<(), String> {
    if call_id.trim().is_empty() {
        return Err("call_id is required".to_owned());
    }
    Ok(())
}

impl CallStarted {
    /// # Errors
    /// Returns a message when the call id or caller number is missing.
    pub fn into_parts(self, region: Region) -> Result<(LeadFacts, ConversationInput), String> {
        require_call_id(&self.call_id)?;
        let facts = caller_facts(self.caller_number.as_deref(), self.caller_name.as_deref(), region);
        if facts.phone.is_none() {
            return Err("caller_number is required for call_started".to_owned());
        }
        let conversation = ConversationInput {
            external_call_id: self.call_id,
            transcript: None,
            duration_secs: None,
            sentiment_score: None,
        };
        Ok((facts, conversation))
    }
}

impl PostCallTranscription {
    /// # Errors
    /// Returns a message when the call id is missing.
    pub fn into_input(self, region: Region) -> Result<PostCallInput, String> {
        require_call_id(&self.call_id)?;
        let execution = self.execution_id.filter(|id| !id.trim().is_empty()).map(|execution_id| {
            ExecutionRef {
                execution_id,
                workflow_name: self.workflow_name.unwrap_or_else(|| "post-call".to_owned()),
            }
        });
        Ok(PostCallInput {
            caller: caller_facts(self.caller_number.as_deref(), self.caller_name.as_deref(), region),
            conversation: ConversationInput {
                external_call_id: self.call_id,
                transcript: self.transcript.as_ref().map(TranscriptBody::render),
                duration_secs: self.duration_secs,
                sentiment_score: self.sentiment_score,
            },
            execution,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackLead {
    pub id: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(alias = "full_name")]
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackConversation {
    pub call_id: String,
    pub transcript: Option<TranscriptBody>,
    pub duration_secs: Option<i64>,
    pub sentiment_score: Option<f64>,
}

/// Workflow automation run report.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowCallback {
    pub workflow_name: String,
    pub execution_id: String,
    pub status: String,
    pub error: Option<String>,
    pub lead: Option<CallbackLead>,
    pub conversation: Option<CallbackConversation>,
    pub profile: Option<ProfileInput>,
}

impl WorkflowCallback {
    /// # Errors
    /// Returns a message for a blank execution id or unknown status.
    pub fn into_input(self, region: Region) -> Result<CallbackInput, String> {
        if self.execution_id.trim().is_empty() {
            return Err("execution_id is required".to_owned());
        }
        let reported_status: WorkflowStatus =
            self.status.parse().map_err(|e| format!("{e}"))?;

        let (lead_id, facts) = match self.lead {
            Some(lead) => {
                let facts = LeadFacts::new(WORKFLOW_SOURCE, SourceTrust::Automated)
                    .phone(lead.phone.as_deref().map(|p| normalize_phone(p, region)))
                    .first_name(lead.first_name.as_deref())
                    .last_name(lead.last_name.as_deref())
                    .full_name(lead.name.as_deref())
                    .email(lead.email.as_deref());
                (lead.id.filter(|id| !id.trim().is_empty()), Some(facts))
            },
            None => (None, None),
        };

        let conversation = self.conversation.map(|c| ConversationInput {
            external_call_id: c.call_id,
            transcript: c.transcript.as_ref().map(TranscriptBody::render),
            duration_secs: c.duration_secs,
            sentiment_score: c.sentiment_score,
        });

        Ok(CallbackInput {
            execution: ExecutionRef {
                execution_id: self.execution_id,
                workflow_name: self.workflow_name,
            },
            reported_status,
            reported_error: self.error,
            lead_id,
            facts,
            conversation,
            profile: self.profile,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crm_contact_converts_to_verified_facts() {
        let hook: CrmWebhook = serde_json::from_value(json!({
            "event_id": "evt-1",
            "type": "contact.created",
            "contact": {"phone": "(555) 123-4567", "name": "John Smith", "email": "John@Example.com"}
        }))
        .unwrap();
        let facts = hook.lead_facts(Region::Us).unwrap();
        assert_eq!(facts.canonical_phone(), Some("+15551234567"));
        assert_eq!(facts.first_name.as_deref(), Some("John"));
        assert_eq!(facts.last_name.as_deref(), Some("Smith"));
        assert_eq!(facts.email.as_deref(), Some("john@example.com"));
        assert_eq!(facts.source, CRM_SOURCE);
        assert_eq!(facts.trust, SourceTrust::Verified);
    }

    #[test]
    fn empty_crm_contact_is_rejected() {
        let hook: CrmWebhook =
            serde_json::from_value(json!({"type": "contact.updated", "contact": {}})).unwrap();
        assert!(hook.lead_facts(Region::Us).is_err());
    }

    #[test]
    fn unknown_crm_event_type_fails_to_parse() {
        let parsed = serde_json::from_value::<CrmWebhook>(json!({"type": "deal.won", "contact": {}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn voice_events_are_tagged() {
        let hook: VoiceWebhook = serde_json::from_value(json!({
            "type": "post_call_transcription",
            "call_id": "call-1",
            "caller_number": "+1 555 123 4567",
            "transcript": [
                {"role": "agent", "message": "Thanks for calling"},
                {"role": "user", "message": "I'm looking at condos"}
            ],
            "execution_id": "exec-1"
        }))
        .unwrap();
        let VoiceWebhook::PostCallTranscription(post) = hook else { panic!("wrong variant") };
        let input = post.into_input(Region::Us).unwrap();
        assert_eq!(input.caller.canonical_phone(), Some("+15551234567"));
        assert_eq!(
            input.conversation.transcript.as_deref(),
            Some("agent: Thanks for calling\nuser: I'm looking at condos")
        );
        assert_eq!(input.execution.unwrap().workflow_name, "post-call");
    }

    #[test]
    fn transcript_may_be_plain_text() {
        let hook: VoiceWebhook = serde_json::from_value(json!({
            "type": "post_call_transcription",
            "call_id": "call-2",
            "transcript": "user: hello"
        }))
        .unwrap();
        let VoiceWebhook::PostCallTranscription(post) = hook else { panic!("wrong variant") };
        let input = post.into_input(Region::Us).unwrap();
        assert_eq!(input.conversation.transcript.as_deref(), Some("user: hello"));
        assert!(input.execution.is_none());
    }

    #[test]
    fn call_started_requires_caller_number() {
        let hook: VoiceWebhook =
            serde_json::from_value(json!({"type": "call_started", "call_id": "call-3"})).unwrap();
        let VoiceWebhook::CallStarted(started) = hook else { panic!("wrong variant") };
        assert!(started.into_parts(Region::Us).is_err());
    }

    #[test]
    fn callback_status_is_validated() {
        let callback: WorkflowCallback = serde_json::from_value(json!({
            "workflow_name": "qualify",
            "execution_id": "wf-1",
            "status": "exploded"
        }))
        .unwrap();
        assert!(callback.into_input(Region::Us).is_err());
    }

    #[test]
    fn callback_execution_is_read_from_untyped_body() {
        let execution =
            peek_callback_execution(&json!({"execution_id": " wf-2 ", "status": 3})).unwrap();
        assert_eq!(execution.execution_id, "wf-2");
        assert_eq!(execution.workflow_name, WORKFLOW_SOURCE);
        assert!(peek_callback_execution(&json!({"execution_id": "  "})).is_none());
        assert!(peek_callback_execution(&json!({"execution_id": 42})).is_none());
    }

    #[test]
    fn peek_event_id_checks_common_keys() {
        assert_eq!(peek_event_id(&json!({"event_id": "a"})), Some("a"));
        assert_eq!(peek_event_id(&json!({"id": "b"})), Some("b"));
        assert_eq!(peek_event_id(&json!({"id": 7})), None);
    }
}
