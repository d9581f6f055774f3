//! API error type and its JSON rendering.
//!
//! Client errors carry their details back to the caller. Server errors are
//! logged in full and answered with a generic message; the store's error
//! detail is only echoed outside production.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use isimm_common::{ApiResponse, MissingFields, ValidationIssues};

use crate::mail::DeliveryError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Body was not valid JSON or had the wrong field types
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    MissingFields(#[from] MissingFields),

    #[error("validation failed")]
    Validation(ValidationIssues),

    /// Contact relay settings are absent
    #[error("contact form is not configured")]
    Configuration,

    /// Store acquisition or query failed
    #[error("{message}: {source}")]
    Store {
        message: &'static str,
        source: StoreError,
        expose: bool,
    },

    #[error("email delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ApiError {
    /// Wrap a store failure under a caller-facing message
    pub fn store(message: &'static str, expose: bool) -> impl FnOnce(StoreError) -> Self {
        move |source| ApiError::Store {
            message,
            source,
            expose,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::MissingFields(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Configuration | ApiError::Store { .. } | ApiError::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::InvalidBody(_) => ApiResponse::failure("Invalid request body."),
            ApiError::MissingFields(_) => ApiResponse::failure("Missing required fields"),
            ApiError::Validation(issues) => {
                ApiResponse::failure("Validation failed.").with_issues(issues)
            }
            ApiError::Configuration => ApiResponse::failure(
                "Contact form is not configured correctly. Please try again later.",
            ),
            ApiError::Store {
                message,
                source,
                expose,
            } => {
                error!("{}: {}", message, source);
                ApiResponse::failure(message).with_error(expose.then(|| source.to_string()))
            }
            ApiError::Delivery(e) => {
                error!("Email provider error: {}", e);
                ApiResponse::failure("Failed to send your message. Please try again later.")
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_fields_is_400() {
        let (status, body) = render(MissingFields(vec!["title"]).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "Missing required fields" })
        );
    }

    #[tokio::test]
    async fn test_store_error_detail_only_when_exposed() {
        let err = StoreError::Connection("server selection timeout".to_string());
        let (status, body) = render(ApiError::store("Failed to create event", true)(err)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to create event");
        assert_eq!(body["error"], "connection failed: server selection timeout");

        let err = StoreError::Connection("server selection timeout".to_string());
        let (_, body) = render(ApiError::store("Failed to create event", false)(err)).await;
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_delivery_error_hides_provider_body() {
        let err = DeliveryError::Rejected {
            status: 403,
            body: "invalid api key re_123".to_string(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("re_123"));
        assert_eq!(body["success"], false);
    }
}
