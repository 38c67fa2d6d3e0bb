//! Environment variable parsing with warn-level logging for invalid values.

use std::time::Duration;

use crate::constants::{DEFAULT_MAX_TRANSCRIPT_CHARS, DEFAULT_MIN_CONFIDENCE, DEFAULT_REGION};
use crate::phone::Region;

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Read a non-empty string variable.
#[must_use]
pub fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Tunables of the reconciliation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub default_region: Region,
    pub min_confidence: f64,
    pub max_transcript_chars: usize,
    pub extraction_max_retries: u32,
    pub extraction_base_delay: Duration,
    pub extraction_max_delay: Duration,
    pub extraction_max_elapsed: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_region: Region::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            extraction_max_retries: 3,
            extraction_base_delay: Duration::from_millis(1000),
            extraction_max_delay: Duration::from_millis(8000),
            extraction_max_elapsed: Duration::from_secs(45),
        }
    }
}

impl PipelineSettings {
    /// Build settings from `LEADFLOW_*` variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let region_code = env_parse_with_default("LEADFLOW_DEFAULT_REGION", DEFAULT_REGION.to_owned());
        let default_region = Region::from_code(&region_code).unwrap_or_else(|| {
            tracing::warn!(region = %region_code, "unknown LEADFLOW_DEFAULT_REGION, using US");
            Region::default()
        });

        let raw_confidence = env_parse_with_default("LEADFLOW_MIN_CONFIDENCE", DEFAULT_MIN_CONFIDENCE);
        let min_confidence = raw_confidence.clamp(0.0, 1.0);
        if (min_confidence - raw_confidence).abs() > f64::EPSILON {
            tracing::warn!(
                original = raw_confidence,
                clamped = min_confidence,
                "LEADFLOW_MIN_CONFIDENCE clamped to [0.0, 1.0]"
            );
        }

        Self {
            default_region,
            min_confidence,
            max_transcript_chars: env_parse_with_default(
                "LEADFLOW_MAX_TRANSCRIPT_CHARS",
                defaults.max_transcript_chars,
            ),
            extraction_max_retries: env_parse_with_default(
                "LEADFLOW_EXTRACTION_MAX_RETRIES",
                defaults.extraction_max_retries,
            ),
            extraction_base_delay: Duration::from_millis(env_parse_with_default(
                "LEADFLOW_EXTRACTION_BASE_DELAY_MS",
                1000_u64,
            )),
            extraction_max_delay: Duration::from_millis(env_parse_with_default(
                "LEADFLOW_EXTRACTION_MAX_DELAY_MS",
                8000_u64,
            )),
            extraction_max_elapsed: Duration::from_secs(env_parse_with_default(
                "LEADFLOW_EXTRACTION_MAX_ELAPSED_SECS",
                45_u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SAFETY (all tests below): each test owns a unique variable name, so no
    // other thread reads or writes the same key concurrently.

    #[test]
    fn test_env_parse_valid_value() {
        let var_name = "TEST_LEADFLOW_ENV_PARSE_VALID_41822";
        unsafe { std::env::set_var(var_name, "42") };
        let result: u32 = env_parse_with_default(var_name, 10);
        assert_eq!(result, 42);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_invalid_value() {
        let var_name = "TEST_LEADFLOW_ENV_PARSE_INVALID_41823";
        unsafe { std::env::set_var(var_name, "banana") };
        let result: u32 = env_parse_with_default(var_name, 10);
        assert_eq!(result, 10);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_missing_var() {
        let result: u32 = env_parse_with_default("TEST_LEADFLOW_ENV_PARSE_MISSING_41824", 10);
        assert_eq!(result, 10);
    }

    #[test]
    fn test_env_non_empty_ignores_blank() {
        let var_name = "TEST_LEADFLOW_ENV_NON_EMPTY_41825";
        unsafe { std::env::set_var(var_name, "   ") };
        assert_eq!(env_non_empty(var_name), None);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_default_settings_match_documented_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.extraction_max_retries, 3);
        assert!((settings.min_confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(settings.default_region, Region::Us);
    }
}
