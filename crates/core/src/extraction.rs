//! Structured extraction schema, extraction records and AI profiles.
//!
//! `ExtractedLead` is the exact document the extraction service must return.
//! Every scalar carries a confidence in `[0, 1]`; values at or below the
//! configured threshold are dropped before anything is persisted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::lead::{LeadFacts, SourceTrust};
use crate::phone::{Region, normalize_phone};

/// Categorical buying intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadTemperature {
    Hot,
    Warm,
    Cold,
}

impl LeadTemperature {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

impl FromStr for LeadTemperature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            _ => Err(CoreError::invalid("lead temperature", s)),
        }
    }
}

/// A scalar value with the extractor's confidence in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredField<T> {
    pub value: Option<T>,
    #[serde(default)]
    pub confidence: f64,
}

impl<T> Default for ScoredField<T> {
    fn default() -> Self {
        Self { value: None, confidence: 0.0 }
    }
}

impl<T> ScoredField<T> {
    #[must_use]
    pub const fn new(value: T, confidence: f64) -> Self {
        Self { value: Some(value), confidence }
    }

    fn retain_above(&mut self, threshold: f64) {
        if self.confidence <= threshold {
            *self = Self::default();
        }
    }

    fn present_confidence(&self) -> Option<f64> {
        self.value.as_ref().map(|_| self.confidence)
    }
}

/// Target schema of the extraction service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedLead {
    pub name: ScoredField<String>,
    pub phone: ScoredField<String>,
    pub email: ScoredField<String>,
    pub property_type: ScoredField<String>,
    pub loan_type: ScoredField<String>,
    pub price_range: ScoredField<String>,
    pub timeline: ScoredField<String>,
    pub pre_approval_status: ScoredField<String>,
    pub temperature: ScoredField<LeadTemperature>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub interested_in: Vec<String>,
    #[serde(default)]
    pub requested_actions: Vec<String>,
}

const SCALAR_FIELD_COUNT: u32 = 9;

impl ExtractedLead {
    /// Check the invariants serde cannot: confidences are finite and in `[0, 1]`.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, confidence) in self.confidences() {
            if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                return Err(CoreError::InvalidValue {
                    kind: "confidence",
                    value: format!("{name}={confidence}"),
                });
            }
        }
        Ok(())
    }

    /// Drop every scalar whose confidence does not exceed `threshold`.
    #[must_use]
    pub fn retain_confident(mut self, threshold: f64) -> Self {
        self.name.retain_above(threshold);
        self.phone.retain_above(threshold);
        self.email.retain_above(threshold);
        self.property_type.retain_above(threshold);
        self.loan_type.retain_above(threshold);
        self.price_range.retain_above(threshold);
        self.timeline.retain_above(threshold);
        self.pre_approval_status.retain_above(threshold);
        self.temperature.retain_above(threshold);
        self
    }

    /// Share of scalar fields holding a value.
    #[must_use]
    pub fn completeness_score(&self) -> f64 {
        let present = self.present_confidences();
        f64::from(u32::try_from(present.len()).unwrap_or(SCALAR_FIELD_COUNT))
            / f64::from(SCALAR_FIELD_COUNT)
    }

    /// Mean confidence of scalar fields holding a value, `0.0` when none.
    #[must_use]
    pub fn confidence_score(&self) -> f64 {
        let present = self.present_confidences();
        if present.is_empty() {
            return 0.0;
        }
        let count = f64::from(u32::try_from(present.len()).unwrap_or(SCALAR_FIELD_COUNT));
        present.iter().sum::<f64>() / count
    }

    /// Identity facts implied by the transcript; always `Inferred`.
    #[must_use]
    pub fn lead_facts(&self, source: &str, region: Region) -> LeadFacts {
        LeadFacts::new(source, SourceTrust::Inferred)
            .phone(self.phone.value.as_deref().map(|p| normalize_phone(p, region)))
            .full_name(self.name.value.as_deref())
            .email(self.email.value.as_deref())
    }

    fn confidences(&self) -> [(&'static str, f64); 9] {
        [
            ("name", self.name.confidence),
            ("phone", self.phone.confidence),
            ("email", self.email.confidence),
            ("property_type", self.property_type.confidence),
            ("loan_type", self.loan_type.confidence),
            ("price_range", self.price_range.confidence),
            ("timeline", self.timeline.confidence),
            ("pre_approval_status", self.pre_approval_status.confidence),
            ("temperature", self.temperature.confidence),
        ]
    }

    fn present_confidences(&self) -> Vec<f64> {
        [
            self.name.present_confidence(),
            self.phone.present_confidence(),
            self.email.present_confidence(),
            self.property_type.present_confidence(),
            self.loan_type.present_confidence(),
            self.price_range.present_confidence(),
            self.timeline.present_confidence(),
            self.pre_approval_status.present_confidence(),
            self.temperature.present_confidence(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// The current extraction of one conversation (upserted by `conversation_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    pub conversation_id: String,
    pub lead_id: String,
    /// Confidence-filtered fields.
    pub fields: ExtractedLead,
    pub extraction_version: String,
    pub raw_extraction_payload: String,
    pub created_at: DateTime<Utc>,
}

/// Latest qualification view of a lead from one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiProfile {
    pub lead_id: String,
    pub conversation_id: String,
    pub temperature: Option<LeadTemperature>,
    pub property_type: Option<String>,
    pub loan_type: Option<String>,
    pub price_range: Option<String>,
    pub timeline: Option<String>,
    pub pre_approval_status: Option<String>,
    pub concerns: Vec<String>,
    pub interested_in: Vec<String>,
    pub requested_actions: Vec<String>,
    pub summary: Option<String>,
    pub completeness_score: f64,
    pub confidence_score: f64,
    pub extraction_version: String,
    pub updated_at: DateTime<Utc>,
}

impl AiProfile {
    /// Project a confidence-filtered extraction onto a profile.
    #[must_use]
    pub fn from_extraction(
        lead_id: &str,
        conversation_id: &str,
        fields: &ExtractedLead,
        version: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id: lead_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            temperature: fields.temperature.value,
            property_type: fields.property_type.value.clone(),
            loan_type: fields.loan_type.value.clone(),
            price_range: fields.price_range.value.clone(),
            timeline: fields.timeline.value.clone(),
            pre_approval_status: fields.pre_approval_status.value.clone(),
            concerns: fields.concerns.clone(),
            interested_in: fields.interested_in.clone(),
            requested_actions: fields.requested_actions.clone(),
            summary: None,
            completeness_score: fields.completeness_score(),
            confidence_score: fields.confidence_score(),
            extraction_version: version.to_owned(),
            updated_at: now,
        }
    }
}

/// Pre-computed profile fragment delivered by a workflow callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileInput {
    pub temperature: Option<LeadTemperature>,
    pub property_type: Option<String>,
    pub loan_type: Option<String>,
    pub price_range: Option<String>,
    pub timeline: Option<String>,
    pub pre_approval_status: Option<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub interested_in: Vec<String>,
    #[serde(default)]
    pub requested_actions: Vec<String>,
    pub summary: Option<String>,
    pub completeness_score: Option<f64>,
    pub confidence_score: Option<f64>,
    pub extraction_version: Option<String>,
}

impl ProfileInput {
    /// Convert into a stored profile; missing scores are derived from presence.
    #[must_use]
    pub fn into_profile(
        self,
        lead_id: &str,
        conversation_id: &str,
        default_version: &str,
        now: DateTime<Utc>,
    ) -> AiProfile {
        let scalars = [
            self.temperature.is_some(),
            self.property_type.is_some(),
            self.loan_type.is_some(),
            self.price_range.is_some(),
            self.timeline.is_some(),
            self.pre_approval_status.is_some(),
        ];
        let present = scalars.iter().filter(|p| **p).count();
        let derived_completeness = f64::from(u32::try_from(present).unwrap_or(0))
            / f64::from(u32::try_from(scalars.len()).unwrap_or(1));

        AiProfile {
            lead_id: lead_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            temperature: self.temperature,
            property_type: self.property_type,
            loan_type: self.loan_type,
            price_range: self.price_range,
            timeline: self.timeline,
            pre_approval_status: self.pre_approval_status,
            concerns: self.concerns,
            interested_in: self.interested_in,
            requested_actions: self.requested_actions,
            summary: self.summary,
            completeness_score: self.completeness_score.unwrap_or(derived_completeness).clamp(0.0, 1.0),
            confidence_score: self.confidence_score.unwrap_or(0.0).clamp(0.0, 1.0),
            extraction_version: self.extraction_version.unwrap_or_else(|| default_version.to_owned()),
            updated_at: now,
        }
    }
}
