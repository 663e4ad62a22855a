//! Mapping from [`DomainError`] to HTTP responses

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ApiResponse;
use crate::shared::errors::DomainError;

/// Error response in the standard envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Seconds, sent as `Retry-After`
    pub retry_after: Option<u32>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let status = match &error {
            DomainError::NotFound { .. } | DomainError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidTransition { .. }
            | DomainError::Validation(_)
            | DomainError::PreconditionFailed(_)
            | DomainError::InvalidSignature
            | DomainError::MalformedCallback(_)
            | DomainError::AmountMismatch { .. }
            | DomainError::UnrecognizedStatus { .. } => StatusCode::BAD_REQUEST,
            DomainError::SlotUnavailable(_)
            | DomainError::ResourceContended(_)
            | DomainError::TransactionConflict(_) => StatusCode::CONFLICT,
            DomainError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Gateway(_) => StatusCode::BAD_GATEWAY,
        };

        match error {
            DomainError::SlotUnavailable(_) => {
                Self::new(status, "Vehicle is not available for these dates")
            }
            DomainError::ResourceContended(_) => Self {
                status,
                message: "Vehicle is being booked by another request, please try again".to_string(),
                retry_after: Some(1),
            },
            DomainError::TransactionConflict(detail) => {
                tracing::warn!(error = %detail, "Transaction aborted by a concurrent writer");
                Self {
                    status,
                    message: "Concurrent update, please try again".to_string(),
                    retry_after: Some(1),
                }
            }
            // Details stay in the logs
            DomainError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure");
                Self::new(status, "Storage temporarily unavailable")
            }
            DomainError::Gateway(detail) => {
                tracing::error!(error = %detail, "Payment provider failure");
                Self::new(status, "Payment provider unavailable")
            }
            other => Self::new(status, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ApiResponse::<()>::error(self.message))).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
