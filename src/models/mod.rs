//! Patient records, inbound webhook events and storage keys.

pub mod enums;
pub mod event;
pub mod patient;
pub mod storage_key;

pub use enums::{EmergencyStatus, EventKind, UnmatchedInsight};
pub use event::{InitialEvent, InsightEvent, WebhookEvent, INSIGHT_EVENT_TYPE};
pub use patient::{determine_emergency_status, parse_pain_level, PatientPatch, PatientRecord};
pub use storage_key::{digits_only, StorageKey};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
