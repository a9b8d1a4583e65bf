//! Inbound webhook payloads.
//!
//! Two shapes arrive on the same endpoint. Anything whose `event_type` is
//! `conversation_insight_result` is an insight event; everything else,
//! including payloads with no `event_type`, is an initial call event.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use super::enums::EventKind;

pub const INSIGHT_EVENT_TYPE: &str = "conversation_insight_result";

/// Initial call event: contact and triage fields at the top level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub pain_level: Option<Value>,
}

/// Follow-up event carrying the AI-generated call summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightEvent {
    #[serde(default)]
    pub payload: Option<InsightPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightPayload {
    #[serde(default)]
    pub results: Vec<InsightResult>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<InsightMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_control_id: Option<String>,
}

impl InsightEvent {
    /// Summary text of the first result, if any.
    pub fn summary(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .results
            .first()?
            .result
            .as_deref()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.payload.as_ref()?.conversation_id.as_deref()
    }

    pub fn call_control_id(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .metadata
            .as_ref()?
            .call_control_id
            .as_deref()
    }
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Initial(InitialEvent),
    Insight(InsightEvent),
}

impl WebhookEvent {
    /// Classify and parse a webhook body. The body must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(de::Error::custom("webhook body must be a JSON object"));
        }
        let is_insight =
            value.get("event_type").and_then(Value::as_str) == Some(INSIGHT_EVENT_TYPE);
        if is_insight {
            InsightEvent::deserialize(value).map(Self::Insight)
        } else {
            InitialEvent::deserialize(value).map(Self::Initial)
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Initial(_) => EventKind::Initial,
            Self::Insight(_) => EventKind::Insight,
        }
    }
}

/// Accept a string or a number; numbers are kept in their JSON text form.
/// Any other JSON type reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
