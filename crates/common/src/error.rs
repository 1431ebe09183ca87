//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Unauthorized`] → 401
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::EncryptionFailure`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: not a JSON object, or a required field is missing.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request did not carry a valid access token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The addressed record kind or record id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Sealing a sensitive field failed; the enclosing write was aborted.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::NotFound(_) => 404,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(ServiceError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).code(),
            "encryption_failure"
        );
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("missing field holderName".into());
        assert!(e.to_string().contains("missing field holderName"));
    }
}
