use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline::notify::PracticeSettings;
use crate::pipeline::{InsightPolicy, UnmatchedInsight};

/// Application-level constants
pub const APP_NAME: &str = "clinic-intake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Record directory used when `DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Listen address used when `INTAKE_BIND_ADDR` is not set.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Log filter applied when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinic_intake_lib=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid listen address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("Invalid value for {var}: {value:?} (expected {expected})")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Runtime configuration, resolved once at startup and threaded into the
/// components that need it.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub insight: InsightPolicy,
    pub practice: PracticeSettings,
    /// Outbound email relay. `None` logs notifications instead of sending.
    pub email_relay_url: Option<String>,
}

impl IntakeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let addr_raw = get("INTAKE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidAddress {
                value: addr_raw.clone(),
                reason: e.to_string(),
            })?;

        let on_unmatched = match get("INSIGHT_UNMATCHED") {
            None => UnmatchedInsight::default(),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "INSIGHT_UNMATCHED",
                value: raw,
                expected: "ignore | create",
            })?,
        };

        let consume_after_notify = match get("INSIGHT_CONSUME") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                var: "INSIGHT_CONSUME",
                value: raw,
                expected: "true | false",
            })?,
        };

        let defaults = PracticeSettings::default();
        let practice = PracticeSettings {
            practice_name: get("PRACTICE_NAME").unwrap_or(defaults.practice_name),
            receptionist_email: get("RECEPTIONIST_EMAIL").unwrap_or(defaults.receptionist_email),
            from_email: get("PRACTICE_FROM_EMAIL").unwrap_or(defaults.from_email),
        };

        Ok(Self {
            data_dir,
            bind_addr,
            insight: InsightPolicy {
                on_unmatched,
                consume_after_notify,
            },
            practice,
            email_relay_url: get("EMAIL_RELAY_URL"),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
