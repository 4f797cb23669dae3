//! Source listing responses returned by the player backend

use crate::error::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `sources` is either an encrypted string or an already-decoded list
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourcesField {
    Encrypted(String),
    Plain(Value),
}

/// Response envelope of a `getSources` request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesResponse {
    pub sources: SourcesField,
    #[serde(default)]
    pub tracks: Vec<Value>,
    #[serde(default = "default_encrypted")]
    pub encrypted: bool,
    #[serde(default)]
    pub server: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_encrypted() -> bool {
    true
}

impl SourcesResponse {
    /// Parse a response body
    pub fn parse(body: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Ciphertext that still needs the player key, if any
    pub fn ciphertext(&self) -> Option<&str> {
        match &self.sources {
            SourcesField::Encrypted(text) if self.encrypted => Some(text.as_str()),
            _ => None,
        }
    }

    /// Sources that need no decryption
    pub fn plain_sources(&self) -> Result<Option<Value>, ResolveError> {
        match &self.sources {
            SourcesField::Plain(value) => Ok(Some(value.clone())),
            SourcesField::Encrypted(text) if !self.encrypted => {
                Ok(Some(serde_json::from_str(text)?))
            }
            SourcesField::Encrypted(_) => Ok(None),
        }
    }

    /// Combine decoded sources with the rest of the envelope
    pub fn into_resolved(self, sources: Value) -> ResolvedSources {
        ResolvedSources {
            sources,
            tracks: self.tracks,
            server: self.server,
            extra: self.extra,
        }
    }
}

/// Decoded source listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSources {
    pub sources: Value,
    pub tracks: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
