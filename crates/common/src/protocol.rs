//! Request and response types exchanged over the HTTP API.
//!
//! Record bodies themselves are free-form JSON objects whose field set is
//! declared per kind by the vault's field table; only the envelope types that
//! surround them live here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Export endpoints
// ---------------------------------------------------------------------------

/// Output format for `GET /api/:kind/export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Human-readable `Key: Value` blocks.
    #[default]
    Text,
    /// A pretty-printed JSON array.
    Json,
}

impl ExportFormat {
    /// File extension used in the attachment filename.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }

    /// `Content-Type` header value for the attachment.
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

/// Query string accepted by the export endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

// ---------------------------------------------------------------------------
// Delete endpoint
// ---------------------------------------------------------------------------

/// Response body for `DELETE /api/:kind/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the built-in fallback secret is in use.
    pub status: String,
    /// Whether field encryption is running on the insecure fallback secret.
    pub fallback_secret: bool,
    /// Number of records currently held by the store, across all kinds.
    pub records: usize,
}
