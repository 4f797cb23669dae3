//! AES-256-CBC decryption of salted source payloads

use crate::core::key::DerivedKey;
use crate::error::ResolveError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use tracing::debug;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the `Salted__` + salt header in front of the ciphertext
pub const HEADER_LEN: usize = 16;

const SALT_OFFSET: usize = 8;
const BLOCK_LEN: usize = 16;

/// Decoded salted payload: 16-byte header followed by AES-CBC blocks
#[derive(Debug, Clone)]
pub struct SaltedPayload {
    bytes: Vec<u8>,
}

impl SaltedPayload {
    /// Base64-decode an armored payload and check its shape
    pub fn decode(armored: &str) -> Result<Self, ResolveError> {
        let bytes = STANDARD
            .decode(armored.trim())
            .map_err(|e| ResolveError::MalformedCiphertext(format!("invalid base64: {}", e)))?;

        if bytes.len() < HEADER_LEN {
            return Err(ResolveError::MalformedCiphertext(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let body_len = bytes.len() - HEADER_LEN;
        if body_len == 0 || body_len % BLOCK_LEN != 0 {
            return Err(ResolveError::MalformedCiphertext(format!(
                "{}-byte body is not a whole number of AES blocks",
                body_len
            )));
        }

        Ok(Self { bytes })
    }

    /// Salt bytes 8..16 of the header
    pub fn salt(&self) -> &[u8] {
        &self.bytes[SALT_OFFSET..HEADER_LEN]
    }

    /// Ciphertext after the header
    pub fn ciphertext(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Decrypt and strip PKCS#7 padding
    pub fn decrypt(&self, key: &DerivedKey) -> Result<Vec<u8>, ResolveError> {
        let cipher = Aes256CbcDec::new_from_slices(key.key(), key.iv())
            .map_err(|e| ResolveError::Generic(format!("derived key has wrong length: {}", e)))?;

        let mut buf = self.ciphertext().to_vec();
        let plaintext = cipher
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| ResolveError::PaddingInvalid)?;

        Ok(plaintext.to_vec())
    }

    /// Decrypt into UTF-8 text
    pub fn decrypt_text(&self, key: &DerivedKey) -> Result<String, ResolveError> {
        let plaintext = self.decrypt(key)?;
        debug!("Decrypted {} bytes of payload", plaintext.len());
        Ok(String::from_utf8(plaintext)?)
    }

    /// Decrypt and parse the JSON document
    pub fn decrypt_json(&self, key: &DerivedKey) -> Result<serde_json::Value, ResolveError> {
        let text = self.decrypt_text(key)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Decrypt an armored payload into plaintext
pub fn decrypt_to_string(armored: &str, key: &DerivedKey) -> Result<String, ResolveError> {
    SaltedPayload::decode(armored)?.decrypt_text(key)
}

/// Decrypt an armored payload and parse it as JSON
pub fn decrypt_payload(armored: &str, key: &DerivedKey) -> Result<serde_json::Value, ResolveError> {
    SaltedPayload::decode(armored)?.decrypt_json(key)
}
