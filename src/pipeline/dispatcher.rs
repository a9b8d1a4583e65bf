//! Webhook dispatcher: classifies events, drives record merges and
//! notifies reception.
//!
//! ## Initial path
//! Contact fields come straight from the payload. The record is created or
//! merged under the digits of the caller's phone number.
//!
//! ## Insight path
//! The phone number is recovered from the AI summary. A matching record gets
//! the summary and any extracted symptoms, then reception is emailed. What
//! happens without a match, and whether a notified record is kept, is set by
//! [`InsightPolicy`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;

use super::error::IntakeError;
use super::merger;
use super::notify::{EmailNotifier, PracticeSettingsSource, ReceptionistEmail};
use super::summary::SummaryFields;
use super::{InsightPolicy, UnmatchedInsight};
use crate::models::{
    parse_pain_level, InitialEvent, InsightEvent, PatientPatch, PatientRecord, StorageKey,
    WebhookEvent,
};
use crate::store::{KeyLocks, RecordStore};

/// Summary used when an insight event carries no result text.
pub const NO_SUMMARY: &str = "No summary available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed(String),
}

/// What a successfully handled webhook did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Initial event stored.
    Recorded { key: StorageKey, created: bool },
    /// Insight merged into an existing record.
    Enriched {
        key: StorageKey,
        notification: NotificationStatus,
        consumed: bool,
    },
    /// Insight without a stored record, turned into a new one.
    CreatedFromInsight {
        key: StorageKey,
        notification: NotificationStatus,
        consumed: bool,
    },
    /// Insight without a stored record, left alone.
    Unmatched { key: StorageKey },
}

pub struct WebhookDispatcher {
    store: RecordStore,
    locks: KeyLocks,
    notifier: Arc<dyn EmailNotifier>,
    practice: Arc<dyn PracticeSettingsSource>,
    policy: InsightPolicy,
}

impl WebhookDispatcher {
    pub fn new(
        store: RecordStore,
        notifier: Arc<dyn EmailNotifier>,
        practice: Arc<dyn PracticeSettingsSource>,
        policy: InsightPolicy,
    ) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            notifier,
            practice,
            policy,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn policy(&self) -> InsightPolicy {
        self.policy
    }

    /// Parse and handle a raw webhook body.
    pub async fn handle_webhook(&self, body: Value) -> Result<WebhookOutcome, IntakeError> {
        tracing::debug!(payload = %body, "Processing webhook");
        let event = WebhookEvent::from_value(body).map_err(IntakeError::InvalidPayload)?;
        tracing::info!(kind = %event.kind(), "Webhook received");
        self.handle_event(event).await
    }

    pub async fn handle_event(&self, event: WebhookEvent) -> Result<WebhookOutcome, IntakeError> {
        match event {
            WebhookEvent::Initial(initial) => {
                let span = tracing::info_span!("webhook", kind = "initial");
                self.handle_initial(initial).instrument(span).await
            }
            WebhookEvent::Insight(insight) => {
                let span = tracing::info_span!(
                    "webhook",
                    kind = "insight",
                    conversation_id = insight.conversation_id().unwrap_or("-"),
                    call_control_id = insight.call_control_id().unwrap_or("-"),
                );
                self.handle_insight(insight).instrument(span).await
            }
        }
    }

    async fn handle_initial(&self, event: InitialEvent) -> Result<WebhookOutcome, IntakeError> {
        let phone = event
            .phone
            .filter(|p| !p.trim().is_empty())
            .ok_or(IntakeError::MissingPhone)?;
        let key = StorageKey::from_phone(&phone).ok_or(IntakeError::MissingPhone)?;

        let name = event.name.filter(|n| !n.trim().is_empty());
        let pain_level = event.pain_level.as_ref().and_then(parse_pain_level);
        let record = PatientRecord::new(name, phone, pain_level);

        let _guard = self.locks.lock(&key).await;
        let upserted = merger::upsert(&self.store, &key, record.into_patch()).await?;

        Ok(WebhookOutcome::Recorded {
            key,
            created: upserted.created,
        })
    }

    async fn handle_insight(&self, event: InsightEvent) -> Result<WebhookOutcome, IntakeError> {
        let summary = event.summary().unwrap_or(NO_SUMMARY).to_string();
        let fields = SummaryFields::from_summary(&summary);

        let phone = fields
            .phone
            .value()
            .ok_or(IntakeError::NoPhoneInSummary)?
            .to_string();
        let key = StorageKey::from_phone(&phone).ok_or(IntakeError::NoPhoneInSummary)?;

        let _guard = self.locks.lock(&key).await;

        match self.store.get(&key).await? {
            Some(existing) => {
                let corrupt = |source: serde_json::Error| IntakeError::CorruptRecord {
                    key: key.clone(),
                    source,
                };
                // Nothing is written unless the stored document loads.
                PatientRecord::from_stored(&existing).map_err(corrupt)?;

                let mut patch = PatientPatch::new();
                patch.insert("aiSummary".into(), Value::String(summary));
                if let Some(symptoms) = fields.symptoms.value() {
                    patch.insert("symptoms".into(), Value::String(symptoms.to_string()));
                }

                let merged = merger::merge_patch(Some(existing), patch);
                let record = PatientRecord::from_stored(&merged).map_err(corrupt)?;
                self.store.store(&key, &merged).await?;
                tracing::info!(key = %key, patient = %record.name, "Insight merged into record");

                let (notification, consumed) = self.notify_and_consume(&key, &record).await;
                Ok(WebhookOutcome::Enriched {
                    key,
                    notification,
                    consumed,
                })
            }
            None => match self.policy.on_unmatched {
                UnmatchedInsight::Ignore => {
                    tracing::info!(key = %key, "No stored record matches insight, ignoring");
                    Ok(WebhookOutcome::Unmatched { key })
                }
                UnmatchedInsight::CreateRecord => {
                    let pain_level = fields
                        .pain_level
                        .value()
                        .and_then(|raw| parse_pain_level(&Value::String(raw.to_string())));
                    let mut record = PatientRecord::new(fields.name.into_value(), phone, pain_level);
                    if let Some(symptoms) = fields.symptoms.into_value() {
                        record.symptoms = symptoms;
                    }
                    record.ai_summary = summary;

                    merger::apply(&self.store, &key, None, record.clone().into_patch()).await?;
                    tracing::info!(key = %key, "Created record from unmatched insight");

                    let (notification, consumed) = self.notify_and_consume(&key, &record).await;
                    Ok(WebhookOutcome::CreatedFromInsight {
                        key,
                        notification,
                        consumed,
                    })
                }
            },
        }
    }

    /// Email reception, then delete the record if the policy says so and the
    /// email went out. Failures here never undo the stored record.
    async fn notify_and_consume(
        &self,
        key: &StorageKey,
        record: &PatientRecord,
    ) -> (NotificationStatus, bool) {
        let practice = self.practice.practice_settings();
        let email = ReceptionistEmail::from_record(record);

        if let Err(e) = self.notifier.send_receptionist_summary(&email, &practice).await {
            tracing::warn!(key = %key, error = %e, "Reception email failed, record kept");
            return (NotificationStatus::Failed(e.to_string()), false);
        }
        tracing::info!(key = %key, status = %email.status, "Reception notified");

        if !self.policy.consume_after_notify {
            return (NotificationStatus::Sent, false);
        }
        match self.store.delete(key).await {
            Ok(()) => {
                tracing::info!(key = %key, "Record consumed after notification");
                (NotificationStatus::Sent, true)
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to delete notified record");
                (NotificationStatus::Sent, false)
            }
        }
    }
}

impl WebhookOutcome {
    pub fn key(&self) -> &StorageKey {
        match self {
            Self::Recorded { key, .. }
            | Self::Enriched { key, .. }
            | Self::CreatedFromInsight { key, .. }
            | Self::Unmatched { key } => key,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}
