//! Phone normalization to an E.164-style canonical identifier.
//!
//! Normalization is total: malformed input never errors, it degrades to a raw
//! passthrough with no canonical form. The canonical form is the dedup key for
//! lead identity, so the function must be idempotent.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trailing extension markers: `ext. 12`, `x12`, `#12`.
static EXTENSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:ext\.?|extension|x|#)\s*\d{1,6}\s*$").ok());

const MIN_E164_DIGITS: usize = 8;
const MAX_E164_DIGITS: usize = 15;

/// Region assumed for numbers written in national format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    Us,
    Ca,
    Mx,
    Gb,
    Ie,
    De,
    Fr,
    Es,
    It,
    Nl,
    Au,
    Br,
    In,
}

impl Region {
    /// Parse an ISO 3166 alpha-2 code, case-insensitively.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "US" => Some(Self::Us),
            "CA" => Some(Self::Ca),
            "MX" => Some(Self::Mx),
            "GB" | "UK" => Some(Self::Gb),
            "IE" => Some(Self::Ie),
            "DE" => Some(Self::De),
            "FR" => Some(Self::Fr),
            "ES" => Some(Self::Es),
            "IT" => Some(Self::It),
            "NL" => Some(Self::Nl),
            "AU" => Some(Self::Au),
            "BR" => Some(Self::Br),
            "IN" => Some(Self::In),
            _ => None,
        }
    }

    #[must_use]
    pub const fn calling_code(self) -> &'static str {
        match self {
            Self::Us | Self::Ca => "1",
            Self::Mx => "52",
            Self::Gb => "44",
            Self::Ie => "353",
            Self::De => "49",
            Self::Fr => "33",
            Self::Es => "34",
            Self::It => "39",
            Self::Nl => "31",
            Self::Au => "61",
            Self::Br => "55",
            Self::In => "91",
        }
    }

    const fn is_nanp(self) -> bool {
        matches!(self, Self::Us | Self::Ca)
    }

    /// Regions that dial a leading `0` domestically and drop it internationally.
    const fn has_trunk_zero(self) -> bool {
        matches!(
            self,
            Self::Gb | Self::Ie | Self::De | Self::Fr | Self::Nl | Self::Au | Self::Br | Self::In
        )
    }
}

/// Result of normalizing a free-text phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPhone {
    /// Trimmed input as received.
    pub raw: String,
    /// Canonical `+<country><number>` form, absent when parsing failed.
    pub e164: Option<String>,
}

/// Normalize `input` assuming `region` for national-format numbers.
#[must_use]
pub fn normalize_phone(input: &str, region: Region) -> NormalizedPhone {
    let raw = input.trim().to_owned();
    let e164 = parse_e164(&raw, region);
    if e164.is_none() && !raw.is_empty() {
        tracing::debug!(phone = %raw, "phone did not normalize, keeping raw form only");
    }
    NormalizedPhone { raw, e164 }
}

/// Canonical identifier for `input`: the E.164 form, or the trimmed input.
///
/// `canonical_phone(&canonical_phone(p, r), r) == canonical_phone(p, r)` for all `p`.
#[must_use]
pub fn canonical_phone(input: &str, region: Region) -> String {
    let normalized = normalize_phone(input, region);
    normalized.e164.unwrap_or(normalized.raw)
}

fn parse_e164(raw: &str, region: Region) -> Option<String> {
    let without_ext = match EXTENSION.as_ref() {
        Some(re) => re.replace(raw, "").into_owned(),
        None => raw.to_owned(),
    };
    let text = without_ext.trim();
    if text.is_empty() {
        return None;
    }
    if !text.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')' | '/')) {
        return None;
    }
    // A '+' is only meaningful as the first character.
    if text.rfind('+').is_some_and(|pos| pos != 0) {
        return None;
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();

    if text.starts_with('+') {
        return international(&digits);
    }
    if let Some(rest) = digits.strip_prefix("00") {
        return international(rest);
    }
    if region.is_nanp() {
        if let Some(rest) = digits.strip_prefix("011") {
            return international(rest);
        }
    }
    national(&digits, region)
}

fn international(digits: &str) -> Option<String> {
    if digits.starts_with('0') || !(MIN_E164_DIGITS..=MAX_E164_DIGITS).contains(&digits.len()) {
        return None;
    }
    if let Some(nanp) = digits.strip_prefix('1') {
        return nanp_subscriber(nanp).then(|| format!("+{digits}"));
    }
    Some(format!("+{digits}"))
}

fn national(digits: &str, region: Region) -> Option<String> {
    if region.is_nanp() {
        let subscriber = match digits.len() {
            10 => digits,
            11 => digits.strip_prefix('1')?,
            _ => return None,
        };
        return nanp_subscriber(subscriber).then(|| format!("+1{subscriber}"));
    }

    let significant = if region.has_trunk_zero() {
        digits.strip_prefix('0').unwrap_or(digits)
    } else {
        digits
    };
    if significant.is_empty() || significant.starts_with('0') {
        return None;
    }
    let full = format!("{}{significant}", region.calling_code());
    (significant.len() >= 6 && full.len() <= MAX_E164_DIGITS).then(|| format!("+{full}"))
}

/// Ten digits with an area code that does not start with 0 or 1.
fn nanp_subscriber(subscriber: &str) -> bool {
    subscriber.len() == 10 && !subscriber.starts_with(['0', '1'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_us_national_number() {
        let phone = normalize_phone("(555) 123-4567", Region::Us);
        assert_eq!(phone.e164.as_deref(), Some("+15551234567"));
        assert_eq!(phone.raw, "(555) 123-4567");
    }

    #[test]
    fn accepts_equivalent_spellings() {
        for input in ["+1 555 123 4567", "1-555-123-4567", "555.123.4567", "+15551234567", " 5551234567 "] {
            assert_eq!(
                normalize_phone(input, Region::Us).e164.as_deref(),
                Some("+15551234567"),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn strips_extension() {
        assert_eq!(
            normalize_phone("555-123-4567 ext. 89", Region::Us).e164.as_deref(),
            Some("+15551234567")
        );
    }

    #[test]
    fn national_trunk_zero_is_dropped() {
        assert_eq!(
            normalize_phone("020 7946 0018", Region::Gb).e164.as_deref(),
            Some("+442079460018")
        );
    }

    #[test]
    fn international_prefix_overrides_region() {
        assert_eq!(
            normalize_phone("0044 20 7946 0018", Region::Us).e164.as_deref(),
            Some("+442079460018")
        );
        assert_eq!(
            normalize_phone("+44 20 7946 0018", Region::Us).e164.as_deref(),
            Some("+442079460018")
        );
    }

    #[test]
    fn malformed_input_degrades_to_raw() {
        for input in ["", "   ", "call me maybe", "12345", "1-800-FLOWERS", "555+1234567", "+0123456789"] {
            let phone = normalize_phone(input, Region::Us);
            assert_eq!(phone.e164, None, "input {input:?}");
            assert_eq!(phone.raw, input.trim());
        }
    }

    #[test]
    fn rejects_invalid_nanp_area_code() {
        assert_eq!(normalize_phone("(055) 123-4567", Region::Us).e164, None);
        assert_eq!(normalize_phone("+1 155 123 4567", Region::Us).e164, None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "(555) 123-4567",
            "+44 20 7946 0018",
            "020 7946 0018",
            "0044 20 7946 0018",
            "not a phone",
            "  12345 ",
            "",
            "+1 (555) 123-4567 x12",
            "+61 2 9374 4000",
        ];
        for region in [Region::Us, Region::Gb, Region::Au] {
            for input in inputs {
                let once = canonical_phone(input, region);
                let twice = canonical_phone(&once, region);
                assert_eq!(once, twice, "input {input:?} region {region:?}");
            }
        }
    }

    #[test]
    fn region_codes_parse_case_insensitively() {
        assert_eq!(Region::from_code("gb"), Some(Region::Gb));
        assert_eq!(Region::from_code("UK"), Some(Region::Gb));
        assert_eq!(Region::from_code("zz"), None);
    }
}
