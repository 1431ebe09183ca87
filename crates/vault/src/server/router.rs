//! Axum router construction.

use std::time::Duration;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// `/api/*` sits behind the access-token guard; `/health` does not.
pub fn build(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route(
            "/:kind",
            get(handlers::list)
                .post(handlers::create)
                .delete(handlers::delete_all),
        )
        .route("/:kind/export", get(handlers::export_all))
        .route(
            "/:kind/:id",
            get(handlers::show)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .route("/:kind/:id/export", get(handlers::export_one))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_token));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::server::middleware::DEFAULT_REQUEST_TIMEOUT;

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default(), DEFAULT_REQUEST_TIMEOUT);
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(AppState::default(), DEFAULT_REQUEST_TIMEOUT);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        // Degraded on the fallback secret, but still 200.
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn every_kind_is_routed() {
        for kind in common::RecordKind::ALL {
            let app = build(AppState::default(), DEFAULT_REQUEST_TIMEOUT);
            let req = Request::builder()
                .uri(format!("/api/{}", kind.slug()))
                .body(Body::empty())
                .unwrap();
            let resp = app.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), 200, "{kind}");
        }
    }

    #[tokio::test]
    async fn missing_record_returns_404() {
        let app = build(AppState::default(), DEFAULT_REQUEST_TIMEOUT);
        let req = Request::builder()
            .uri("/api/servers/does-not-exist")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }
}
