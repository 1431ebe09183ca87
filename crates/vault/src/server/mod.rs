//! Axum HTTP(S) server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with the record, export and health routes.
//! - Guard `/api/*` with the optional access token.
//! - Inject shared application state (`AppState`) into handlers.
//! - Serve over rustls when TLS is configured.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;
