//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Status mapping policy:
//! - unknown token, slug or product is always 404, never 403, so callers
//!   cannot distinguish "exists but forbidden" from "does not exist"
//! - rate-limit rejections are 429 with a `Retry-After` header, distinct
//!   from validation failures so callers know to back off rather than
//!   change input
//! - upstream and database failures return a generic message; details
//!   stay in logs and Sentry

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use droplink_core::validate::QuotaError;

use crate::db::RepositoryError;
use crate::services::klaviyo::KlaviyoError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// List Subscription Provider call failed.
    #[error("Klaviyo error: {0}")]
    Klaviyo(#[from] KlaviyoError),

    /// Plan quota exceeded.
    #[error("{0}")]
    Quota(#[from] QuotaError),

    /// Request failed validation.
    #[error("{0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited; retry after the given number of seconds.
    #[error("Rate limited")]
    RateLimited { retry_after: u64 },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_) | Self::Klaviyo(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Klaviyo(_) => StatusCode::BAD_GATEWAY,
            Self::Quota(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Klaviyo(_) => "External service error".to_string(),
            Self::RateLimited { retry_after } => {
                format!("Too many requests. Retry in {retry_after} seconds.")
            }
            _ => self.to_string(),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let Self::RateLimited { retry_after } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("page".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Validation("bad slug".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited { retry_after: 30 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_quota_errors_are_bad_requests() {
        let err = AppError::Quota(QuotaError::TooManyLinks { max: 5, got: 6 });
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rate_limited_sets_retry_after_header() {
        let response = AppError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("42")
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection string leaked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Body assembled from a fixed message; the detail stays server-side.
    }
}
