//! Axum middleware applied to the router.
//!
//! Request tracing, timeout enforcement and response compression come from
//! `tower-http`; the access-token guard lives here.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use common::ServiceError;
use tracing::warn;

use super::{error::ApiError, state::AppState};
use crate::crypto::compare_securely;

/// Default per-request timeout applied to all routes.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Require `Authorization: Bearer <token>` when an access token is configured.
///
/// A no-op when [`AppState::access_token`] is `None`.
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.access_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if compare_securely(token, expected) => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "rejected request without a valid access token");
            ApiError::from(ServiceError::Unauthorized(
                "missing or invalid access token".into(),
            ))
            .into_response()
        }
    }
}
