use thiserror::Error;

/// Errors raised by pure domain logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },
}

impl CoreError {
    pub(crate) fn invalid(kind: &'static str, value: &str) -> Self {
        Self::InvalidValue { kind, value: value.to_owned() }
    }
}
