//! The envelope codec: sealing logical values into at-rest text and back.
//!
//! # Framing
//!
//! ```text
//! plaintext  = "v1:" + (string as-is | JSON text of any other value)
//! sealed     = s1.<base64url(nonce)>.<base64url(AES-256-GCM-SIV(plaintext))>
//! ```
//!
//! Sensitive columns hold a mix of sealed text and legacy plaintext written
//! before field encryption existed. [`EnvelopeCodec::open`] therefore never
//! fails: anything that does not open under the current key comes back
//! unchanged as [`Opened::Fallback`].

use serde_json::Value;
use thiserror::Error;

use super::cipher::{CipherError, SealedBytes};
use super::key::SecretKey;

/// Tag prepended to every plaintext before encryption.
pub const VERSION_TAG: &str = "v1:";

/// Errors raised while sealing. Opening has no error type.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The value could not be rendered as JSON text.
    #[error("failed to serialise value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The cipher rejected the operation.
    #[error("cipher failure: {0}")]
    Cipher(#[from] CipherError),
}

/// Why a value came back from [`EnvelopeCodec::open`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Input was not a string (a legacy row with a raw number, say).
    NotText,
    /// Input was a string that is not sealed text.
    NotSealed,
    /// Input looked sealed but failed authentication: wrong key or tampered.
    Unauthentic,
    /// Decryption succeeded but did not yield UTF-8.
    NotUtf8,
    /// Decryption succeeded but yielded nothing.
    Empty,
}

/// Outcome of opening a stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    /// The value was sealed under the current key and has been recovered.
    Decrypted(Value),
    /// The input was null or empty and passed through untouched.
    Absent(Value),
    /// The input did not open and is returned exactly as given.
    Fallback {
        original: Value,
        reason: FallbackReason,
    },
}

impl Opened {
    /// The recovered value, or the original input on fallback.
    pub fn into_value(self) -> Value {
        match self {
            Opened::Decrypted(v) | Opened::Absent(v) => v,
            Opened::Fallback { original, .. } => original,
        }
    }

    /// Why the value fell back, if it did.
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            Opened::Fallback { reason, .. } => Some(*reason),
            Opened::Decrypted(_) | Opened::Absent(_) => None,
        }
    }
}

/// How the framed remainder is turned back into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    /// Parse as JSON, fall back to the raw string.
    Json,
    /// Always the raw string.
    Text,
}

/// Seals and opens values under a single process-wide [`SecretKey`].
///
/// Stateless apart from the key; safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    key: SecretKey,
}

impl EnvelopeCodec {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Convenience for `EnvelopeCodec::new(SecretKey::from_secret(secret))`.
    pub fn from_secret(secret: &str) -> Self {
        Self::new(SecretKey::from_secret(secret))
    }

    /// Seal `value` into an opaque text value.
    ///
    /// Absent values (see [`is_absent`]) are returned unchanged. Strings are
    /// framed as-is; every other value is framed as its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if serialisation or the cipher fails. The
    /// caller must abort the write rather than store the plaintext.
    pub fn seal(&self, value: &Value) -> Result<Value, EnvelopeError> {
        if is_absent(value) {
            return Ok(value.clone());
        }

        let body = match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other)?,
        };
        let framed = format!("{VERSION_TAG}{body}");
        let sealed = SealedBytes::seal(framed.as_bytes(), &self.key)?;
        Ok(Value::String(sealed.to_text()))
    }

    /// Open a stored value, parsing the recovered plaintext as JSON when it is
    /// valid JSON and returning it as a string otherwise.
    pub fn open(&self, stored: &Value) -> Opened {
        self.open_with(stored, Decode::Json)
    }

    /// Open a stored value whose logical type is text.
    ///
    /// Identical to [`EnvelopeCodec::open`] except that the recovered
    /// plaintext is never JSON-parsed, so `"00123"` or `"true"` stay strings.
    pub fn open_text(&self, stored: &Value) -> Opened {
        self.open_with(stored, Decode::Text)
    }

    fn open_with(&self, stored: &Value, decode: Decode) -> Opened {
        if is_absent(stored) {
            return Opened::Absent(stored.clone());
        }
        let Value::String(text) = stored else {
            return fallback(stored, FallbackReason::NotText);
        };

        let sealed = match SealedBytes::parse(text) {
            Ok(s) => s,
            Err(_) => return fallback(stored, FallbackReason::NotSealed),
        };
        let bytes = match sealed.open(&self.key) {
            Ok(b) => b,
            Err(_) => return fallback(stored, FallbackReason::Unauthentic),
        };
        if bytes.is_empty() {
            return fallback(stored, FallbackReason::Empty);
        }
        let plaintext = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => return fallback(stored, FallbackReason::NotUtf8),
        };

        let body = plaintext.strip_prefix(VERSION_TAG).unwrap_or(&plaintext);
        let value = match decode {
            Decode::Json => {
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
            }
            Decode::Text => Value::String(body.to_owned()),
        };
        Opened::Decrypted(value)
    }
}

/// `true` for values that are never sealed: null, the empty string, and
/// empty arrays or objects.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn fallback(stored: &Value, reason: FallbackReason) -> Opened {
    Opened::Fallback {
        original: stored.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::TAG_LEN;
    use proptest::prelude::*;
    use serde_json::json;

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::from_secret("unit-test-secret")
    }

    #[test]
    fn seal_open_bank_name() {
        let c = codec();
        let sealed = c.seal(&json!("HDFC Bank")).unwrap();
        let text = sealed.as_str().unwrap();
        assert!(!text.is_empty());
        assert_ne!(text, "HDFC Bank");
        assert!(!text.contains("HDFC"));
        assert_eq!(c.open(&sealed), Opened::Decrypted(json!("HDFC Bank")));
    }

    #[test]
    fn seal_open_custom_field_map() {
        let c = codec();
        let fields = json!({"dataCenter": "us-east", "tier": "gold"});
        let sealed = c.seal(&fields).unwrap();
        assert!(sealed.is_string());
        let opened = c.open(&sealed).into_value();
        assert_eq!(opened, json!({"tier": "gold", "dataCenter": "us-east"}));
    }

    #[test]
    fn seal_is_nondeterministic() {
        let c = codec();
        let a = c.seal(&json!("same")).unwrap();
        let b = c.seal(&json!("same")).unwrap();
        assert_ne!(a, b);
        assert_eq!(c.open(&a).into_value(), json!("same"));
        assert_eq!(c.open(&b).into_value(), json!("same"));
    }

    #[test]
    fn absent_values_pass_through() {
        let c = codec();
        assert_eq!(c.seal(&Value::Null).unwrap(), Value::Null);
        assert_eq!(c.seal(&json!("")).unwrap(), json!(""));
        assert_eq!(c.seal(&json!({})).unwrap(), json!({}));
        assert_eq!(c.open(&Value::Null), Opened::Absent(Value::Null));
        assert_eq!(c.open(&json!("")), Opened::Absent(json!("")));
    }

    #[test]
    fn legacy_plaintext_returned_unchanged() {
        let c = codec();
        let opened = c.open(&json!("hunter2"));
        assert_eq!(
            opened,
            Opened::Fallback {
                original: json!("hunter2"),
                reason: FallbackReason::NotSealed,
            }
        );
        assert_eq!(opened.into_value(), json!("hunter2"));
    }

    #[test]
    fn legacy_number_is_not_text() {
        let opened = codec().open(&json!(4111));
        assert!(matches!(
            opened,
            Opened::Fallback { reason: FallbackReason::NotText, .. }
        ));
    }

    #[test]
    fn wrong_key_falls_back() {
        let sealed = codec().seal(&json!("secret")).unwrap();
        let other = EnvelopeCodec::from_secret("another-secret");
        let opened = other.open(&sealed);
        assert!(matches!(
            opened,
            Opened::Fallback { reason: FallbackReason::Unauthentic, .. }
        ));
        assert_eq!(opened.into_value(), sealed);
    }

    #[test]
    fn truncated_ciphertext_falls_back() {
        let c = codec();
        let sealed = c.seal(&json!("50100123456789")).unwrap();
        let text = sealed.as_str().unwrap();
        let truncated = json!(&text[..text.len() - 5]);
        let opened = c.open(&truncated);
        assert!(opened.fallback_reason().is_some());
        assert_eq!(opened.into_value(), truncated);
    }

    #[test]
    fn untagged_plaintext_still_opens() {
        let c = codec();
        let raw = SealedBytes::seal(b"no tag here", &SecretKey::from_secret("unit-test-secret"))
            .unwrap()
            .to_text();
        assert_eq!(c.open(&json!(raw)).into_value(), json!("no tag here"));
    }

    #[test]
    fn json_open_parses_numeric_text() {
        let c = codec();
        let sealed = c.seal(&json!("12345")).unwrap();
        assert_eq!(c.open(&sealed).into_value(), json!(12345));
        assert_eq!(c.open_text(&sealed).into_value(), json!("12345"));
    }

    #[test]
    fn open_text_keeps_structured_text_raw() {
        let c = codec();
        let sealed = c.seal(&json!({"a": 1})).unwrap();
        assert_eq!(c.open_text(&sealed).into_value(), json!(r#"{"a":1}"#));
    }

    #[test]
    fn is_absent_cases() {
        assert!(is_absent(&Value::Null));
        assert!(is_absent(&json!("")));
        assert!(is_absent(&json!([])));
        assert!(!is_absent(&json!(0)));
        assert!(!is_absent(&json!(false)));
        assert!(!is_absent(&json!(" ")));
    }

    fn scalar_or_structure() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z ]{1,16}"
                .prop_filter("reads as JSON", |s| serde_json::from_str::<Value>(s).is_err())
                .prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 1..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn forged_sealed_text() -> impl Strategy<Value = Value> {
        (
            prop::array::uniform12(any::<u8>()),
            prop::collection::vec(any::<u8>(), TAG_LEN..64),
        )
            .prop_map(|(nonce, ciphertext)| json!(SealedBytes { nonce, ciphertext }.to_text()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: open(seal(v)) deep-equals v for every non-absent value
        /// whose JSON reading is unambiguous.
        #[test]
        fn prop_round_trip(value in scalar_or_structure()) {
            let c = codec();
            let sealed = c.seal(&value).unwrap();
            prop_assert_eq!(c.open(&sealed).into_value(), value);
        }

        /// Property: open_text(seal(s)) == s for every non-empty string,
        /// including ones that read as JSON.
        #[test]
        fn prop_text_round_trip(s in "\\PC{1,32}") {
            let c = codec();
            let sealed = c.seal(&json!(s)).unwrap();
            prop_assert_eq!(c.open_text(&sealed).into_value(), json!(s));
        }

        /// Property: arbitrary plain strings come back unchanged.
        #[test]
        fn prop_legacy_strings_unchanged(s in "[^.]{1,64}") {
            let stored = json!(s);
            prop_assert_eq!(codec().open(&stored).into_value(), stored);
        }

        /// Property: well-formed sealed text that was never sealed under the
        /// key falls back as unauthentic and comes back unchanged.
        #[test]
        fn prop_forged_sealed_text_unchanged(stored in forged_sealed_text()) {
            let opened = codec().open(&stored);
            prop_assert_eq!(opened.fallback_reason(), Some(FallbackReason::Unauthentic));
            prop_assert_eq!(opened.into_value(), stored);
        }
    }
}
