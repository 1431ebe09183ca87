//! [`SecretKey`]: the process-wide field-encryption key.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Secret used when `ENCRYPTION_KEY` is not configured.
///
/// Anyone holding the source can open data sealed under it. Production
/// deployments must override it; `/health` reports `degraded` while it is in use.
pub const FALLBACK_SECRET: &str = "vault-fallback-secret-not-for-production";

/// Fixed-size key buffer holding exactly [`KEY_LEN`] bytes.
///
/// The bytes are the SHA-256 digest of the configured secret text. Memory is
/// overwritten with zeroes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Build the key from secret text of any length.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&digest);
        Self(buf)
    }

    /// Key bytes at their fixed AES-256 width.
    pub fn as_array(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_secret_same_key() {
        let a = SecretKey::from_secret("correct horse");
        let b = SecretKey::from_secret("correct horse");
        assert_eq!(a.as_array(), b.as_array());
    }

    #[test]
    fn different_secret_different_key() {
        let a = SecretKey::from_secret("correct horse");
        let b = SecretKey::from_secret("battery staple");
        assert_ne!(a.as_array(), b.as_array());
    }

    #[test]
    fn key_is_sha256_of_secret() {
        let digest = Sha256::digest(b"x");
        assert_eq!(&SecretKey::from_secret("x").as_array()[..], &digest[..]);
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = SecretKey::from_secret(FALLBACK_SECRET);
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
