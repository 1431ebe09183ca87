//! Field encryption: the AES-256-GCM-SIV cipher, the process key, and the
//! envelope codec layered on top of them.
//!
//! This module is free of HTTP and store dependencies.
//!
//! # Sealed text format
//!
//! ```text
//! s1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! `s1` names the cipher layout; the `v1:` tag inside the plaintext names the
//! framing, so either can change without breaking existing rows.

pub mod cipher;
pub mod compare;
pub mod envelope;
pub mod key;

pub use compare::compare_securely;
pub use envelope::{EnvelopeCodec, EnvelopeError, FallbackReason, Opened};
