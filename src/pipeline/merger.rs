//! Shallow merge of patient fields into stored records.
//!
//! Callers hold the key's lock from [`crate::store::KeyLocks`] around these
//! calls; the read and the write are not atomic on their own.

use serde_json::Value;

use crate::models::{PatientPatch, StorageKey};
use crate::store::{RecordStore, StoreError};

/// Result of writing a patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    /// The record as written.
    pub record: Value,
    /// `true` when no record existed before.
    pub created: bool,
}

/// Overlay `patch` on `existing`. Patch fields win; existing-only fields stay.
pub fn merge_patch(existing: Option<Value>, patch: PatientPatch) -> Value {
    match existing {
        Some(Value::Object(mut fields)) => {
            fields.extend(patch);
            Value::Object(fields)
        }
        _ => Value::Object(patch),
    }
}

/// Read the record for `key`, merge `patch` into it and write it back.
pub async fn upsert(
    store: &RecordStore,
    key: &StorageKey,
    patch: PatientPatch,
) -> Result<Upserted, StoreError> {
    let existing = store.get(key).await?;
    apply(store, key, existing, patch).await
}

/// Merge `patch` into an already-loaded record and write the result.
pub async fn apply(
    store: &RecordStore,
    key: &StorageKey,
    existing: Option<Value>,
    patch: PatientPatch,
) -> Result<Upserted, StoreError> {
    let created = existing.is_none();
    if matches!(existing, Some(ref v) if !v.is_object()) {
        tracing::warn!(key = %key, "Stored record is not a JSON object, replacing it");
    }

    let record = merge_patch(existing, patch);
    store.store(key, &record).await?;

    let patient = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    tracing::info!(key = %key, patient, created, "Patient record updated");

    Ok(Upserted { record, created })
}
