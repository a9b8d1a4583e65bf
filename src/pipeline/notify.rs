//! Reception notifications.
//!
//! The dispatcher only sees the [`EmailNotifier`] and
//! [`PracticeSettingsSource`] traits. `HttpEmailNotifier` hands the message to
//! an HTTP email relay; `LogNotifier` writes it to the log when no relay is
//! configured.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EmergencyStatus, PatientRecord};

const RELAY_TIMEOUT_SECS: u64 = 10;

/// Clinic details used to address the reception email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSettings {
    pub practice_name: String,
    pub receptionist_email: String,
    pub from_email: String,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            practice_name: "Our Practice".into(),
            receptionist_email: "frontdesk@example.com".into(),
            from_email: "noreply@example.com".into(),
        }
    }
}

pub trait PracticeSettingsSource: Send + Sync {
    fn practice_settings(&self) -> PracticeSettings;
}

/// Settings fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticPracticeSettings(pub PracticeSettings);

impl PracticeSettingsSource for StaticPracticeSettings {
    fn practice_settings(&self) -> PracticeSettings {
        self.0.clone()
    }
}

/// Call summary sent to reception.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceptionistEmail {
    pub name: String,
    pub phone: String,
    pub symptoms: String,
    pub status: EmergencyStatus,
    pub summary: String,
    #[serde(rename = "timeCalled")]
    pub time_called: String,
    pub timestamp: String,
}

impl ReceptionistEmail {
    pub fn from_record(record: &PatientRecord) -> Self {
        Self {
            name: record.name.clone(),
            phone: record.phone.clone(),
            symptoms: record.symptoms.clone(),
            status: record.effective_status(),
            summary: record.ai_summary.clone(),
            time_called: record.time_called.clone(),
            timestamp: record.timestamp.clone(),
        }
    }

    pub fn subject(&self, practice: &PracticeSettings) -> String {
        let prefix = match self.status {
            EmergencyStatus::Emergency => "URGENT: ",
            EmergencyStatus::NonEmergency => "",
        };
        format!(
            "{prefix}{} call summary: {}",
            practice.practice_name, self.name
        )
    }

    pub fn render_text(&self, practice: &PracticeSettings) -> String {
        format!(
            "New call for {practice_name}\n\n\
             Name: {name}\n\
             Phone: {phone}\n\
             Status: {status}\n\
             Symptoms: {symptoms}\n\
             Time called: {time_called}\n\
             Received: {timestamp}\n\n\
             Summary:\n{summary}\n",
            practice_name = practice.practice_name,
            name = self.name,
            phone = self.phone,
            status = self.status,
            symptoms = self.symptoms,
            time_called = self.time_called,
            timestamp = self.timestamp,
            summary = self.summary,
        )
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Email relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email relay rejected message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait EmailNotifier: Send + Sync {
    async fn send_receptionist_summary(
        &self,
        email: &ReceptionistEmail,
        practice: &PracticeSettings,
    ) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl EmailNotifier for LogNotifier {
    async fn send_receptionist_summary(
        &self,
        email: &ReceptionistEmail,
        practice: &PracticeSettings,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            to = %practice.receptionist_email,
            subject = %email.subject(practice),
            status = %email.status,
            "No email relay configured, notification logged only"
        );
        Ok(())
    }
}

/// JSON body posted to the relay.
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    from: &'a str,
    subject: String,
    text: String,
    patient: &'a ReceptionistEmail,
}

/// Posts notifications to an HTTP email relay.
#[derive(Debug, Clone)]
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    relay_url: String,
}

impl HttpEmailNotifier {
    pub fn new(relay_url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(RELAY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
        })
    }
}

#[async_trait]
impl EmailNotifier for HttpEmailNotifier {
    async fn send_receptionist_summary(
        &self,
        email: &ReceptionistEmail,
        practice: &PracticeSettings,
    ) -> Result<(), NotifyError> {
        let message = RelayMessage {
            to: &practice.receptionist_email,
            from: &practice.from_email,
            subject: email.subject(practice),
            text: email.render_text(practice),
            patient: email,
        };

        let response = self.client.post(&self.relay_url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(status = status.as_u16(), "Reception email handed to relay");
        Ok(())
    }
}

/// Notifier double that records every message it is asked to send.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<ReceptionistEmail>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<ReceptionistEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_receptionist_summary(
        &self,
        email: &ReceptionistEmail,
        _practice: &PracticeSettings,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "relay down".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    fn sample_email(status: EmergencyStatus) -> ReceptionistEmail {
        ReceptionistEmail {
            name: "Jane Doe".into(),
            phone: "555-123-4567".into(),
            symptoms: "cracked molar".into(),
            status,
            summary: "Caller reports a cracked molar.".into(),
            time_called: "9:15:00 AM".into(),
            timestamp: "2024-05-01T09:15:00.000Z".into(),
        }
    }

    type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Start a relay stub on loopback that answers every POST with `status`.
    async fn start_relay(status: StatusCode) -> (SocketAddr, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/send",
                post(
                    move |State(seen): State<Captured>, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push(body);
                        status
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, captured)
    }

    #[test]
    fn emergency_subject_is_flagged() {
        let practice = PracticeSettings::default();
        let urgent = sample_email(EmergencyStatus::Emergency).subject(&practice);
        assert!(urgent.starts_with("URGENT: "));
        assert!(urgent.contains("Jane Doe"));

        let routine = sample_email(EmergencyStatus::NonEmergency).subject(&practice);
        assert!(!routine.contains("URGENT"));
    }

    #[test]
    fn text_body_lists_call_details() {
        let practice = PracticeSettings {
            practice_name: "Riverside Dental".into(),
            ..PracticeSettings::default()
        };
        let text = sample_email(EmergencyStatus::Emergency).render_text(&practice);
        assert!(text.contains("Riverside Dental"));
        assert!(text.contains("Phone: 555-123-4567"));
        assert!(text.contains("Status: Emergency"));
        assert!(text.contains("Symptoms: cracked molar"));
        assert!(text.contains("Caller reports a cracked molar."));
    }

    #[test]
    fn email_serializes_document_field_names() {
        let json = serde_json::to_value(sample_email(EmergencyStatus::NonEmergency)).unwrap();
        assert_eq!(json["status"], "Non-Emergency");
        assert_eq!(json["timeCalled"], "9:15:00 AM");
    }

    #[test]
    fn email_from_record_derives_status() {
        let record = PatientRecord::from_stored(&serde_json::json!({
            "name": "Jane",
            "phone": "555-123-4567",
            "pain_level": 9,
            "aiSummary": "summary text",
        }))
        .unwrap();
        let email = ReceptionistEmail::from_record(&record);
        assert_eq!(email.status, EmergencyStatus::Emergency);
        assert_eq!(email.summary, "summary text");
        assert_eq!(email.symptoms, "Not specified");
    }

    #[test]
    fn static_settings_returns_configured_values() {
        let settings = PracticeSettings {
            practice_name: "Northside Clinic".into(),
            ..PracticeSettings::default()
        };
        let source = StaticPracticeSettings(settings.clone());
        assert_eq!(source.practice_settings(), settings);
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let result = LogNotifier
            .send_receptionist_summary(
                &sample_email(EmergencyStatus::NonEmergency),
                &PracticeSettings::default(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn http_notifier_posts_to_relay() {
        let (addr, captured) = start_relay(StatusCode::ACCEPTED).await;
        let notifier = HttpEmailNotifier::new(format!("http://{addr}/send")).unwrap();
        let practice = PracticeSettings::default();

        notifier
            .send_receptionist_summary(&sample_email(EmergencyStatus::Emergency), &practice)
            .await
            .unwrap();

        let seen = captured.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["to"], practice.receptionist_email.as_str());
        assert_eq!(seen[0]["from"], practice.from_email.as_str());
        assert!(seen[0]["subject"].as_str().unwrap().starts_with("URGENT"));
        assert_eq!(seen[0]["patient"]["phone"], "555-123-4567");
    }

    #[tokio::test]
    async fn http_notifier_reports_rejection() {
        let (addr, _captured) = start_relay(StatusCode::BAD_GATEWAY).await;
        let notifier = HttpEmailNotifier::new(format!("http://{addr}/send")).unwrap();

        let err = notifier
            .send_receptionist_summary(
                &sample_email(EmergencyStatus::NonEmergency),
                &PracticeSettings::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 502, .. }));
    }

    #[tokio::test]
    async fn http_notifier_reports_unreachable_relay() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = HttpEmailNotifier::new(format!("http://{addr}/send")).unwrap();
        let err = notifier
            .send_receptionist_summary(
                &sample_email(EmergencyStatus::NonEmergency),
                &PracticeSettings::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }
}
