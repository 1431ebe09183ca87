//! The `s1` cipher layout: AES-256-GCM-SIV under the process [`SecretKey`].
//!
//! ```text
//! s1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext || tag)>
//! ```
//!
//! Nonces are random per seal, so equal plaintexts never share a sealed text.
//! GCM-SIV stays safe if two nonces ever collide.

use aes_gcm_siv::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use super::key::SecretKey;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// First segment of every sealed text.
pub const CIPHER_MARKER: &str = "s1";

#[derive(Debug, Error)]
pub enum CipherError {
    /// Sealing failed, or the sealed bytes did not authenticate under the key.
    #[error("aead operation failed")]
    AeadFailure,

    /// The text is not in the `s1` layout.
    #[error("invalid sealed text format")]
    InvalidFormat,
}

/// Nonce and authenticated ciphertext of one sealed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedBytes {
    /// Encrypt `plaintext` under `key` with a fresh nonce.
    ///
    /// # Errors
    ///
    /// [`CipherError::AeadFailure`] if the AEAD rejects the input. A 32-byte
    /// key and 12-byte nonce leave only oversized plaintexts to trigger it.
    pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<Self, CipherError> {
        let nonce = Aes256GcmSiv::generate_nonce(&mut OsRng);
        let ciphertext = aead(key)
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::AeadFailure)?;
        Ok(Self {
            nonce: nonce.into(),
            ciphertext,
        })
    }

    /// Decrypt and authenticate under `key`.
    ///
    /// # Errors
    ///
    /// [`CipherError::AeadFailure`] for a wrong key or altered bytes.
    pub fn open(&self, key: &SecretKey) -> Result<Vec<u8>, CipherError> {
        aead(key)
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| CipherError::AeadFailure)
    }

    pub fn to_text(&self) -> String {
        format!(
            "{CIPHER_MARKER}.{}.{}",
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }

    /// Split sealed text into nonce and ciphertext. No key is involved, so a
    /// successful parse says nothing about authenticity.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidFormat`] unless `s` has the `s1` marker, a
    /// 12-byte nonce and at least a tag's worth of ciphertext.
    pub fn parse(s: &str) -> Result<Self, CipherError> {
        let Some((CIPHER_MARKER, rest)) = s.split_once('.') else {
            return Err(CipherError::InvalidFormat);
        };
        let Some((nonce_b64, ct_b64)) = rest.split_once('.') else {
            return Err(CipherError::InvalidFormat);
        };

        let nonce: [u8; NONCE_LEN] = decode(nonce_b64)?
            .try_into()
            .map_err(|_| CipherError::InvalidFormat)?;
        let ciphertext = decode(ct_b64)?;
        if ciphertext.len() < TAG_LEN {
            return Err(CipherError::InvalidFormat);
        }
        Ok(Self { nonce, ciphertext })
    }
}

fn aead(key: &SecretKey) -> Aes256GcmSiv {
    Aes256GcmSiv::new(key.as_array().into())
}

fn decode(segment: &str) -> Result<Vec<u8>, CipherError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| CipherError::InvalidFormat)
}
