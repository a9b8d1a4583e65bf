use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use super::enums::EmergencyStatus;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNSPECIFIED_SYMPTOMS: &str = "Not specified";

/// Pain level at or above which a caller is flagged as an emergency.
pub const EMERGENCY_PAIN_THRESHOLD: f64 = 7.0;

/// Shallow field set merged into a stored record. Keys present here win.
pub type PatientPatch = Map<String, Value>;

/// Persisted contact and triage data for one caller.
///
/// Field names match the JSON documents on disk. Older documents stored
/// fields exactly as received, so loading is lenient: missing, null or
/// mistyped fields fall back to the record defaults, and a numeric-string
/// pain level is read as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default = "default_name", deserialize_with = "name_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_pain_level")]
    pub pain_level: Option<Number>,
    #[serde(default = "default_symptoms", deserialize_with = "symptoms_or_default")]
    pub symptoms: String,
    #[serde(
        default,
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<EmergencyStatus>,
    #[serde(rename = "timeCalled", default, deserialize_with = "text_or_empty")]
    pub time_called: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub timestamp: String,
    #[serde(rename = "aiSummary", default, deserialize_with = "text_or_empty")]
    pub ai_summary: String,
}

fn default_name() -> String {
    UNKNOWN_NAME.to_string()
}

fn default_symptoms() -> String {
    UNSPECIFIED_SYMPTOMS.to_string()
}

/// Strings as-is, numbers in their JSON text form, anything else absent.
fn stored_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(stored_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn name_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(stored_text(Value::deserialize(deserializer)?)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(default_name))
}

fn symptoms_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(stored_text(Value::deserialize(deserializer)?).unwrap_or_else(default_symptoms))
}

fn lenient_pain_level<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Number>, D::Error> {
    Ok(parse_pain_level(&Value::deserialize(deserializer)?))
}

fn lenient_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<EmergencyStatus>, D::Error> {
    Ok(stored_text(Value::deserialize(deserializer)?).and_then(|s| s.parse().ok()))
}

impl PatientRecord {
    /// Start a record for a caller, stamping the call time now.
    pub fn new(name: Option<String>, phone: impl Into<String>, pain_level: Option<Number>) -> Self {
        let now = chrono::Local::now();
        let status = determine_from_number(pain_level.as_ref());
        Self {
            name: name.unwrap_or_else(default_name),
            phone: phone.into(),
            pain_level,
            symptoms: default_symptoms(),
            status: Some(status),
            time_called: now.format("%-I:%M:%S %p").to_string(),
            timestamp: now
                .with_timezone(&chrono::Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ai_summary: String::new(),
        }
    }

    /// Load a record from a stored JSON document. Fails only when the
    /// document is not a JSON object.
    pub fn from_stored(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Every field as a patch, for creating or fully overwriting a record.
    pub fn into_patch(self) -> PatientPatch {
        let mut patch = Map::new();
        patch.insert("name".into(), Value::String(self.name));
        patch.insert("phone".into(), Value::String(self.phone));
        patch.insert(
            "pain_level".into(),
            self.pain_level.map(Value::Number).unwrap_or(Value::Null),
        );
        patch.insert("symptoms".into(), Value::String(self.symptoms));
        if let Some(status) = self.status {
            patch.insert("status".into(), Value::String(status.as_str().into()));
        }
        patch.insert("timeCalled".into(), Value::String(self.time_called));
        patch.insert("timestamp".into(), Value::String(self.timestamp));
        patch.insert("aiSummary".into(), Value::String(self.ai_summary));
        patch
    }

    /// Status as stored, or derived from the pain level when absent.
    pub fn effective_status(&self) -> EmergencyStatus {
        self.status
            .unwrap_or_else(|| determine_from_number(self.pain_level.as_ref()))
    }
}

/// Read a pain level from a JSON number or numeric string.
pub fn parse_pain_level(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Number::from(i))
            } else {
                s.parse::<f64>().ok().and_then(Number::from_f64)
            }
        }
        _ => None,
    }
}

/// Triage status for a raw pain level value.
///
/// Null, non-numeric and NaN values are never an emergency.
pub fn determine_emergency_status(pain_level: &Value) -> EmergencyStatus {
    determine_from_number(parse_pain_level(pain_level).as_ref())
}

fn determine_from_number(pain_level: Option<&Number>) -> EmergencyStatus {
    match pain_level.and_then(Number::as_f64) {
        Some(level) if level >= EMERGENCY_PAIN_THRESHOLD => EmergencyStatus::Emergency,
        _ => EmergencyStatus::NonEmergency,
    }
}
