//! Webhook intake pipeline.
//!
//! ```text
//! Dispatcher → Summary rules → Merger → RecordStore
//!            └→ EmailNotifier
//! ```

pub mod dispatcher;
pub mod error;
pub mod merger;
pub mod notify;
pub mod summary;

use serde::Serialize;

pub use crate::models::UnmatchedInsight;
pub use dispatcher::{NotificationStatus, WebhookDispatcher, WebhookOutcome};
pub use error::{IntakeError, Severity};
pub use notify::{
    EmailNotifier, HttpEmailNotifier, LogNotifier, NotifyError, PracticeSettings,
    PracticeSettingsSource, ReceptionistEmail, StaticPracticeSettings,
};
pub use summary::{Extraction, Precedence, SummaryField, SummaryFields};

/// How insight events are handled when they arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsightPolicy {
    /// What to do when no stored record matches the summary's phone number.
    pub on_unmatched: UnmatchedInsight,
    /// Delete the record once the clinic has been notified successfully.
    pub consume_after_notify: bool,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        Self {
            on_unmatched: UnmatchedInsight::Ignore,
            consume_after_notify: true,
        }
    }
}
