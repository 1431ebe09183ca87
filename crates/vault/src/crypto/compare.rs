//! Timing-safe string comparison for access tokens.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare two strings without leaking where they differ.
///
/// Both sides are hashed first so the comparison runs over equal-length
/// digests regardless of input lengths.
pub fn compare_securely(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.as_slice().ct_eq(db.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_match() {
        assert!(compare_securely("s3cret-token", "s3cret-token"));
    }

    #[test]
    fn different_strings_do_not_match() {
        assert!(!compare_securely("s3cret-token", "s3cret-tokeN"));
        assert!(!compare_securely("short", "much longer value"));
        assert!(!compare_securely("", "x"));
    }
}
