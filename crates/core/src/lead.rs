//! Lead records and the field-merge policy applied on every sighting.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::phone::NormalizedPhone;

/// Pipeline state of a lead as seen by the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
    Lost,
}

impl LeadStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Unqualified => "unqualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "unqualified" => Ok(Self::Unqualified),
            "converted" => Ok(Self::Converted),
            "lost" => Ok(Self::Lost),
            _ => Err(CoreError::invalid("lead status", s)),
        }
    }
}

/// How much a source's field values are believed.
///
/// Ordered: `Inferred < Automated < Verified`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceTrust {
    /// Guessed from a conversation (caller ID, transcript extraction).
    Inferred,
    /// Produced by an automation run.
    Automated,
    /// Entered or confirmed by a human in the CRM.
    Verified,
}

/// The central party record, deduplicated by `phone_e164`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: String,
    pub phone_e164: Option<String>,
    pub phone_raw: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Build a fresh lead from the first sighting of an identity.
    #[must_use]
    pub fn from_facts(id: String, facts: &LeadFacts, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phone_e164: facts.phone.as_ref().and_then(|p| p.e164.clone()),
            phone_raw: facts.phone.as_ref().map(|p| p.raw.clone()).filter(|r| !r.is_empty()),
            first_name: facts.first_name.clone(),
            last_name: facts.last_name.clone(),
            email: facts.email.clone(),
            source: facts.source.clone(),
            status: LeadStatus::New,
            notes: facts.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Name shown by inbound-call routing, `None` when no name is known.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> =
            [self.first_name.as_deref(), self.last_name.as_deref()].into_iter().flatten().collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// Denormalized phone → lead index used by inbound-call routing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhoneMapping {
    pub phone_e164: String,
    pub lead_id: String,
    pub display_name: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Identity facts carried by one inbound event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadFacts {
    pub phone: Option<NormalizedPhone>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub source: String,
    pub trust: SourceTrust,
}

impl LeadFacts {
    #[must_use]
    pub fn new(source: impl Into<String>, trust: SourceTrust) -> Self {
        Self {
            phone: None,
            first_name: None,
            last_name: None,
            email: None,
            notes: None,
            source: source.into(),
            trust,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: Option<NormalizedPhone>) -> Self {
        self.phone = phone.filter(|p| !p.raw.is_empty());
        self
    }

    #[must_use]
    pub fn first_name(mut self, value: Option<&str>) -> Self {
        self.first_name = clean(value);
        self
    }

    #[must_use]
    pub fn last_name(mut self, value: Option<&str>) -> Self {
        self.last_name = clean(value);
        self
    }

    /// Split a full name into first name and the remainder as last name.
    /// Explicit first/last names already set are kept.
    #[must_use]
    pub fn full_name(mut self, value: Option<&str>) -> Self {
        if let Some(full) = clean(value) {
            let (first, last) = match full.split_once(char::is_whitespace) {
                Some((first, rest)) => (first.to_owned(), clean(Some(rest))),
                None => (full, None),
            };
            if self.first_name.is_none() {
                self.first_name = Some(first);
            }
            if self.last_name.is_none() {
                self.last_name = last;
            }
        }
        self
    }

    #[must_use]
    pub fn email(mut self, value: Option<&str>) -> Self {
        self.email = clean(value).map(|e| e.to_lowercase());
        self
    }

    #[must_use]
    pub fn notes(mut self, value: Option<&str>) -> Self {
        self.notes = clean(value);
        self
    }

    #[must_use]
    pub fn canonical_phone(&self) -> Option<&str> {
        self.phone.as_ref().and_then(|p| p.e164.as_deref())
    }

    /// True when the event carries nothing that could identify a caller.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.phone.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }

    /// Compute the changes these facts make to `lead`.
    ///
    /// Blank incoming values never clear anything. Null fields are always
    /// filled. Non-null fields are replaced only by `Verified` sources.
    #[must_use]
    pub fn patch_for(&self, lead: &Lead) -> LeadPatch {
        let overwrite = self.trust == SourceTrust::Verified;
        LeadPatch {
            phone_raw: merge_field(
                lead.phone_raw.as_deref(),
                self.phone.as_ref().map(|p| p.raw.as_str()),
                false,
            ),
            first_name: merge_field(lead.first_name.as_deref(), self.first_name.as_deref(), overwrite),
            last_name: merge_field(lead.last_name.as_deref(), self.last_name.as_deref(), overwrite),
            email: merge_field(lead.email.as_deref(), self.email.as_deref(), overwrite),
            notes: merge_field(lead.notes.as_deref(), self.notes.as_deref(), overwrite),
        }
    }
}

/// Field writes produced by the merge policy; `None` means leave untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub phone_raw: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl LeadPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.phone_raw.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.notes.is_none()
    }

    /// True when the patch touches a field shown in the phone mapping.
    #[must_use]
    pub const fn changes_display_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    pub fn apply(&self, lead: &mut Lead, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        let fields = [
            (&mut lead.phone_raw, &self.phone_raw),
            (&mut lead.first_name, &self.first_name),
            (&mut lead.last_name, &self.last_name),
            (&mut lead.email, &self.email),
            (&mut lead.notes, &self.notes),
        ];
        for (target, value) in fields {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }
        lead.updated_at = now;
    }
}

fn merge_field(existing: Option<&str>, incoming: Option<&str>, overwrite: bool) -> Option<String> {
    let incoming = incoming.map(str::trim).filter(|v| !v.is_empty())?;
    match existing.map(str::trim).filter(|v| !v.is_empty()) {
        None => Some(incoming.to_owned()),
        Some(current) if overwrite && current != incoming => Some(incoming.to_owned()),
        Some(_) => None,
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToOwned::to_owned)
}
