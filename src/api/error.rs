//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{IntakeError, Severity};

/// Structured error response body for webhook senders.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Intake(err) => match err.severity() {
                Severity::Recoverable => {
                    tracing::warn!(code = err.code(), error = %err, "Webhook rejected");
                    (StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.to_string())
                }
                Severity::Fatal => {
                    tracing::error!(code = err.code(), error = %err, "Webhook processing failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.code(),
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::models::StorageKey;
    use crate::store::StoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn missing_phone_returns_422() {
        let response = ApiError::from(IntakeError::MissingPhone).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "MISSING_PHONE");
    }

    #[tokio::test]
    async fn no_phone_in_summary_returns_422() {
        let response = ApiError::from(IntakeError::NoPhoneInSummary).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NO_PHONE_IN_SUMMARY");
    }

    #[tokio::test]
    async fn storage_failure_returns_500_without_details() {
        let key = StorageKey::from_phone("5551234567").unwrap();
        let err = IntakeError::Store(StoreError::NotFound(key));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "STORAGE");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }
}
