//! Intake error types.
//!
//! Every failure in the webhook path ends up here and is classified as
//! recoverable (the payload could not be used) or fatal (the service could
//! not do its job).

use serde::Serialize;
use thiserror::Error;

use crate::models::StorageKey;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Bad or unusable input. Retrying the same payload will not help.
    Recoverable,
    /// Storage or internal failure. The event was not processed.
    Fatal,
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Call event has no usable phone number")]
    MissingPhone,

    #[error("No phone number found in the insight summary")]
    NoPhoneInSummary,

    #[error("Stored record for {key} is not a patient record: {source}")]
    CorruptRecord {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl IntakeError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidPayload(_) | Self::MissingPhone | Self::NoPhoneInSummary => {
                Severity::Recoverable
            }
            Self::CorruptRecord { .. } | Self::Store(_) => Severity::Fatal,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::MissingPhone => "MISSING_PHONE",
            Self::NoPhoneInSummary => "NO_PHONE_IN_SUMMARY",
            Self::CorruptRecord { .. } => "CORRUPT_RECORD",
            Self::Store(_) => "STORAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_problems_are_recoverable() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        for err in [
            IntakeError::InvalidPayload(parse_err),
            IntakeError::MissingPhone,
            IntakeError::NoPhoneInSummary,
        ] {
            assert_eq!(err.severity(), Severity::Recoverable, "{err}");
        }
    }

    #[test]
    fn storage_problems_are_fatal() {
        let key = StorageKey::from_phone("5551234567").unwrap();
        let err = IntakeError::from(StoreError::NotFound(key));
        assert_eq!(err.severity(), Severity::Fatal);
        assert_eq!(err.code(), "STORAGE");
    }

    #[test]
    fn severity_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Severity::Recoverable).unwrap(), "recoverable");
        assert_eq!(serde_json::to_value(Severity::Fatal).unwrap(), "fatal");
    }
}
