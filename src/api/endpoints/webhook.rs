//! Webhook intake endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{IntakeError, WebhookOutcome};

/// `POST /webhook`: accept an initial or insight call event.
///
/// The body is parsed here rather than through the `Json` extractor so that
/// malformed JSON gets the same error shape as any other unusable payload.
pub async fn receive(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(IntakeError::InvalidPayload)?;
    let outcome = ctx.dispatcher.handle_webhook(payload).await?;
    Ok(Json(outcome))
}
