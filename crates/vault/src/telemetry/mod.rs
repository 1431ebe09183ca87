//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext secrets, ciphertext or key material** in any span
//!   attribute or log field. Decryption fallbacks are logged with kind, field
//!   and reason only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   overrides it.

pub mod init;

pub use init::init_telemetry;
