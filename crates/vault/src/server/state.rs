//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use common::RecordKind;

use crate::config::SecretSource;
use crate::crypto::{key::FALLBACK_SECRET, EnvelopeCodec};
use crate::records::RecordTranscoder;
use crate::store::MemoryStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for each
/// request without copying key material or records.
#[derive(Clone)]
pub struct AppState {
    /// Codec holding the process field key.
    pub codec: Arc<EnvelopeCodec>,
    /// Record table, in storage form.
    pub store: MemoryStore,
    /// Bearer token required on `/api/*`, if configured.
    pub access_token: Option<Arc<str>>,
    /// Whether the codec runs on the configured or the fallback secret.
    pub secret_source: SecretSource,
}

impl AppState {
    pub fn new(
        codec: EnvelopeCodec,
        store: MemoryStore,
        access_token: Option<String>,
        secret_source: SecretSource,
    ) -> Self {
        Self {
            codec: Arc::new(codec),
            store,
            access_token: access_token.map(Arc::from),
            secret_source,
        }
    }

    /// Transcoder for `kind` over the shared codec.
    pub fn transcoder(&self, kind: RecordKind) -> RecordTranscoder<'_> {
        RecordTranscoder::new(kind, &self.codec)
    }
}

impl Default for AppState {
    /// Empty store on the fallback secret, no access token. Suitable for tests.
    fn default() -> Self {
        Self::new(
            EnvelopeCodec::from_secret(FALLBACK_SECRET),
            MemoryStore::new(),
            None,
            SecretSource::Fallback,
        )
    }
}
