//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is present but invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::key::FALLBACK_SECRET;
use crate::server::middleware::DEFAULT_REQUEST_TIMEOUT;

/// Validated vault service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Secret text the field-encryption key is derived from. When absent the
    /// built-in fallback secret is used and the service reports `degraded`.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bearer token required on `/api/*` when set.
    #[serde(default)]
    pub access_token: Option<String>,

    /// PEM certificate chain. TLS is enabled only when both paths are set.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// OTLP/gRPC endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the field-encryption secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// `ENCRYPTION_KEY` was provided.
    Configured,
    /// Nothing was provided; the insecure built-in secret is in use.
    Fallback,
}

fn default_listen_port() -> u16 {
    3000
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The secret to derive the field key from, and whether it is the fallback.
    pub fn encryption_secret(&self) -> (&str, SecretSource) {
        match self.encryption_key.as_deref() {
            Some(secret) => (secret, SecretSource::Configured),
            None => (FALLBACK_SECRET, SecretSource::Fallback),
        }
    }

    /// Certificate and key paths when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.tls_cert_path.as_deref(), self.tls_key_path.as_deref()) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_not_blank(self.encryption_key.as_deref(), "ENCRYPTION_KEY")?;
        ensure_not_blank(self.access_token.as_deref(), "ACCESS_TOKEN")?;
        ensure_not_blank(self.tls_cert_path.as_deref(), "TLS_CERT_PATH")?;
        ensure_not_blank(self.tls_key_path.as_deref(), "TLS_KEY_PATH")?;
        ensure_not_blank(
            self.otel_exporter_otlp_endpoint.as_deref(),
            "OTEL_EXPORTER_OTLP_ENDPOINT",
        )?;

        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are reported by presence only.
        f.debug_struct("Config")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .field("listen_port", &self.listen_port)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_not_blank(value: Option<&str>, name: &str) -> Result<()> {
    if let Some(v) = value {
        if v.trim().is_empty() {
            anyhow::bail!("{name} must not be blank when set");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            encryption_key: Some("k3y-material".into()),
            listen_port: default_listen_port(),
            request_timeout_secs: default_request_timeout(),
            access_token: None,
            tls_cert_path: None,
            tls_key_path: None,
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 3000);
        assert_eq!(default_request_timeout(), 30);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_encryption_key() {
        let cfg = Config {
            encryption_key: Some("   ".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_tls() {
        let cfg = Config {
            tls_cert_path: Some("/etc/vault/tls.crt".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
        assert!(cfg.tls_paths().is_none());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_key_selects_fallback_secret() {
        let cfg = Config {
            encryption_key: None,
            ..base()
        };
        let (secret, source) = cfg.encryption_secret();
        assert_eq!(secret, FALLBACK_SECRET);
        assert_eq!(source, SecretSource::Fallback);
    }

    #[test]
    fn configured_key_is_used() {
        let cfg = base();
        let (secret, source) = cfg.encryption_secret();
        assert_eq!(secret, "k3y-material");
        assert_eq!(source, SecretSource::Configured);
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = Config {
            access_token: Some("tok".into()),
            ..base()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("k3y-material"));
        assert!(!out.contains("\"tok\""));
        assert!(out.contains("REDACTED"));
    }
}
