//! Key fragment extraction and AES key derivation

use crate::core::table::{ExtractionTable, Offset};
use crate::error::ResolveError;
use tracing::debug;

/// Length of derived key material: AES-256 key followed by the CBC IV
pub const DERIVED_KEY_LEN: usize = 48;

const AES_KEY_LEN: usize = 32;

/// Working state for pulling key fragments out of a ciphertext string
///
/// Every extraction removes its fragment, so later offsets are shifted back by
/// `drift`, the number of characters removed so far.
#[derive(Debug)]
pub struct KeyExtractor {
    working: String,
    drift: usize,
    key: String,
}

impl KeyExtractor {
    /// Create an extractor over the full encrypted string
    pub fn new(encrypted: impl Into<String>) -> Self {
        Self {
            working: encrypted.into(),
            drift: 0,
            key: String::new(),
        }
    }

    /// Characters removed so far
    pub fn drift(&self) -> usize {
        self.drift
    }

    /// Remove one fragment and append it to the key
    pub fn take(&mut self, offset: &Offset) -> Result<(), ResolveError> {
        let len = self.working.len();
        let out_of_range = || {
            ResolveError::OffsetOutOfRange(format!(
                "{}..{} shifted by {} against {} characters",
                offset.start, offset.end, self.drift, len
            ))
        };

        let start = offset.start.checked_sub(self.drift).ok_or_else(out_of_range)?;
        let end = offset.end.checked_sub(self.drift).ok_or_else(out_of_range)?;
        if start > end || end > len {
            return Err(out_of_range());
        }

        let fragment = self.working.get(start..end).ok_or_else(out_of_range)?;
        self.key.push_str(fragment);

        let mut remainder = String::with_capacity(len - (end - start));
        remainder.push_str(&self.working[..start]);
        remainder.push_str(&self.working[end..]);
        self.working = remainder;
        self.drift += offset.len();

        Ok(())
    }

    /// Consume the extractor, returning `(key, remaining ciphertext)`
    pub fn finish(self) -> (String, String) {
        (self.key, self.working)
    }
}

/// Split the embedded key out of an encrypted string
///
/// Returns the joined key fragments and the ciphertext with them removed.
pub fn extract_key(
    encrypted: &str,
    table: &ExtractionTable,
) -> Result<(String, String), ResolveError> {
    let mut extractor = KeyExtractor::new(encrypted);
    for offset in table {
        extractor.take(offset)?;
    }

    let (key, remainder) = extractor.finish();
    debug!(
        "Extracted {}-character key, {} characters of ciphertext remain",
        key.len(),
        remainder.len()
    );
    Ok((key, remainder))
}

/// AES-256 key and IV derived from a recovered secret
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey {
    bytes: [u8; DERIVED_KEY_LEN],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// AES-256 key, bytes 0..32
    pub fn key(&self) -> &[u8] {
        &self.bytes[..AES_KEY_LEN]
    }

    /// CBC IV, bytes 32..48
    pub fn iv(&self) -> &[u8] {
        &self.bytes[AES_KEY_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single round
///
/// `D1 = MD5(secret || salt)`, `Dn = MD5(Dn-1 || secret || salt)`, until 48
/// bytes have been produced.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> DerivedKey {
    let mut material: Vec<u8> = Vec::with_capacity(DERIVED_KEY_LEN + 16);
    let mut previous: Option<md5::Digest> = None;

    while material.len() < DERIVED_KEY_LEN {
        let mut context = md5::Context::new();
        if let Some(digest) = previous {
            context.consume(digest.0);
        }
        context.consume(secret);
        context.consume(salt);

        let digest = context.compute();
        material.extend_from_slice(&digest.0);
        previous = Some(digest);
    }

    let mut bytes = [0u8; DERIVED_KEY_LEN];
    bytes.copy_from_slice(&material[..DERIVED_KEY_LEN]);
    DerivedKey::from_bytes(bytes)
}
