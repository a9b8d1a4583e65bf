use std::fmt;

use serde::Serialize;

/// Strip every non-digit character from `raw`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Record identifier: the digits of a phone number, nothing else.
///
/// Construction guarantees a non-empty, digits-only value, so a key is
/// always safe to use as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Normalize a phone number into a key. `None` when it has no digits.
    pub fn from_phone(phone: &str) -> Option<Self> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the record for this key.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(digits_only("555-123-4567"), "5551234567");
        assert_eq!(digits_only("(555) 123.4567"), "5551234567");
        assert_eq!(digits_only("+1 555 123 4567"), "15551234567");
    }

    #[test]
    fn digits_only_is_idempotent() {
        for raw in ["555-123-4567", "+1 (800) FLOWERS", "", "abc", "12 34"] {
            let once = digits_only(raw);
            assert_eq!(digits_only(&once), once);
        }
    }

    #[test]
    fn key_from_phone() {
        let key = StorageKey::from_phone("555-123-4567").unwrap();
        assert_eq!(key.as_str(), "5551234567");
        assert_eq!(key.file_name(), "5551234567.json");
        assert_eq!(key.to_string(), "5551234567");
    }

    #[test]
    fn key_requires_digits() {
        assert!(StorageKey::from_phone("Unknown").is_none());
        assert!(StorageKey::from_phone("").is_none());
    }

    #[test]
    fn formatting_variants_share_a_key() {
        let a = StorageKey::from_phone("555-123-4567").unwrap();
        let b = StorageKey::from_phone("(555) 123 4567").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let key = StorageKey::from_phone("555.123.4567").unwrap();
        assert_eq!(serde_json::to_value(&key).unwrap(), "5551234567");
    }
}
