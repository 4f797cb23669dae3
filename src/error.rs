//! Error types for cdn-resolver

use thiserror::Error;

/// Main error type for resolver operations
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("Fetch failed: {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Player structure not found: {0}")]
    StructureNotFound(String),

    #[error("Symbol has no hex assignment: {0}")]
    SymbolUnresolved(String),

    #[error("Offset out of range: {0}")]
    OffsetOutOfRange(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Invalid padding (wrong key or corrupted ciphertext)")]
    PaddingInvalid,

    #[error("Decrypted payload is not valid UTF-8: {0}")]
    EncodingInvalid(#[from] std::string::FromUtf8Error),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Invalid player variant: {0}")]
    InvalidVariant(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] std::num::ParseIntError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl ResolveError {
    /// Check if error is retryable
    ///
    /// Only the fetch boundary can change its outcome between attempts; every
    /// pipeline stage is deterministic.
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::FetchFailed(_) => true,
            ResolveError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if error suggests the player rotated its key since the script was fetched
    pub fn is_stale_key(&self) -> bool {
        matches!(
            self,
            ResolveError::PaddingInvalid
                | ResolveError::EncodingInvalid(_)
                | ResolveError::MalformedPayload(_)
                | ResolveError::OffsetOutOfRange(_)
                | ResolveError::MalformedCiphertext(_)
        )
    }
}
