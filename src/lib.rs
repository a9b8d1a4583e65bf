pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::{ConfigError, IntakeConfig};
use crate::pipeline::{
    EmailNotifier, HttpEmailNotifier, LogNotifier, NotifyError, StaticPracticeSettings,
    WebhookDispatcher,
};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot open record directory: {0}")]
    Store(#[from] StoreError),
    #[error("Cannot build email relay client: {0}")]
    Notifier(#[from] NotifyError),
    #[error("Cannot start HTTP server: {0}")]
    Server(#[from] std::io::Error),
}

/// Process entry point: logging, configuration, then serve until Ctrl-C.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let result = IntakeConfig::from_env()
        .map_err(StartupError::from)
        .and_then(|config| {
            tokio::runtime::Runtime::new()
                .map_err(StartupError::from)?
                .block_on(serve(config))
        });

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Wire the dispatcher from `config` and serve until Ctrl-C.
pub async fn serve(config: IntakeConfig) -> Result<(), StartupError> {
    let ctx = build_context(&config).await?;
    let mut server = api::start_intake_server_on(ctx, config.bind_addr).await?;
    tracing::info!(addr = %server.local_addr(), "Accepting webhooks, Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}

/// Build the shared API context described by `config`.
pub async fn build_context(config: &IntakeConfig) -> Result<ApiContext, StartupError> {
    let store = RecordStore::open(&config.data_dir).await?;
    tracing::info!(data_dir = %config.data_dir.display(), "Record store ready");

    let notifier: Arc<dyn EmailNotifier> = match &config.email_relay_url {
        Some(url) => {
            tracing::info!(relay = %url, "Sending reception email through relay");
            Arc::new(HttpEmailNotifier::new(url.clone())?)
        }
        None => {
            tracing::warn!("EMAIL_RELAY_URL not set, reception email will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let dispatcher = WebhookDispatcher::new(
        store,
        notifier,
        Arc::new(StaticPracticeSettings(config.practice.clone())),
        config.insight,
    );
    tracing::info!(policy = ?config.insight, "Webhook dispatcher ready");

    Ok(ApiContext::new(dispatcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InsightPolicy;

    fn config_for(dir: &tempfile::TempDir, relay: Option<&str>) -> IntakeConfig {
        let data_dir = dir.path().join("records").display().to_string();
        let relay = relay.map(str::to_string);
        IntakeConfig::from_lookup(move |var| match var {
            "DATA_DIR" => Some(data_dir.clone()),
            "EMAIL_RELAY_URL" => relay.clone(),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn build_context_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, None);
        let ctx = build_context(&config).await.unwrap();

        assert!(dir.path().join("records").is_dir());
        assert_eq!(ctx.dispatcher.store().data_dir(), config.data_dir.as_path());
        assert_eq!(ctx.dispatcher.policy(), InsightPolicy::default());
    }

    #[tokio::test]
    async fn build_context_with_relay() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, Some("http://127.0.0.1:9/send"));
        assert!(build_context(&config).await.is_ok());
    }
}
