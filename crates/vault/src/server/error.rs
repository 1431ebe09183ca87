//! Mapping from layer errors to JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use tracing::{error, warn};

use crate::records::TranscodeError;
use crate::store::StoreError;

/// Handler error: a [`ServiceError`] rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<TranscodeError> for ApiError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Seal { kind, field, source } => {
                // The source names only the failing layer, never the value.
                error!(%kind, %field, error = %source, "failed to seal field; write aborted");
                Self(ServiceError::EncryptionFailure(format!(
                    "could not encrypt {field}"
                )))
            }
            mismatch @ TranscodeError::KindMismatch { .. } => {
                Self(ServiceError::Internal(mismatch.to_string()))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self(ServiceError::NotFound(err.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
