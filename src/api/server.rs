//! Intake server lifecycle: starts/stops the axum HTTP server that
//! receives call-center webhooks.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::intake_router;
use crate::api::types::ApiContext;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Handle to a running intake server.
pub struct IntakeServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl IntakeServer {
    /// Address actually bound, with the chosen port when started on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal the server to stop accepting connections.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Intake server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish after shutdown.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Intake server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the intake server on `addr`.
///
/// Port 0 binds an ephemeral port; see [`IntakeServer::local_addr`].
pub async fn start_intake_server_on(
    ctx: ApiContext,
    addr: SocketAddr,
) -> Result<IntakeServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, "Intake server binding");

    let app = intake_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Intake server received shutdown signal");
        };

        tracing::info!(%addr, "Intake server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Intake server error: {e}");
        }

        tracing::info!("Intake server stopped");
    });

    Ok(IntakeServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use crate::pipeline::notify::RecordingNotifier;
    use crate::pipeline::{InsightPolicy, StaticPracticeSettings, WebhookDispatcher};
    use crate::store::RecordStore;

    async fn test_ctx(dir: &tempfile::TempDir) -> ApiContext {
        let store = RecordStore::open(dir.path()).await.unwrap();
        ApiContext::new(WebhookDispatcher::new(
            store,
            Arc::new(RecordingNotifier::default()),
            Arc::new(StaticPracticeSettings::default()),
            InsightPolicy::default(),
        ))
    }

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_intake_server_on(test_ctx(&dir).await, loopback())
            .await
            .expect("server should start");

        assert!(server.local_addr().ip().is_loopback());
        assert!(server.local_addr().port() > 0);

        let url = format!("http://{}/health", server.local_addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn server_accepts_webhooks() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_intake_server_on(test_ctx(&dir).await, loopback())
            .await
            .expect("server should start");
        let port = server.local_addr().port();

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/webhook"))
            .header("Content-Type", "application/json")
            .body(r#"{"name":"Jane","phone":"555-123-4567","pain_level":3}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(dir.path().join("5551234567.json").exists());

        let resp = client
            .post(format!("http://127.0.0.1:{port}/webhook"))
            .body(r#"{"name":"Jane"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = start_intake_server_on(test_ctx(&dir).await, loopback())
            .await
            .unwrap();
        let taken = first.local_addr();

        let second = start_intake_server_on(test_ctx(&dir).await, taken).await;
        assert!(second.is_err());

        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = start_intake_server_on(test_ctx(&dir).await, loopback())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown(); // Second call should be safe
        server.stopped().await;
    }
}
