//! Player variants and script sources

use crate::error::ResolveError;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Known player builds, each served from its own host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerVariant {
    E1,
    E4,
    E6,
}

impl PlayerVariant {
    /// Get all available variants
    pub fn all() -> [PlayerVariant; 3] {
        [PlayerVariant::E1, PlayerVariant::E4, PlayerVariant::E6]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerVariant::E1 => "e1",
            PlayerVariant::E4 => "e4",
            PlayerVariant::E6 => "e6",
        }
    }

    /// Default location of the minified player script
    pub fn script_url(&self) -> &'static str {
        match self {
            PlayerVariant::E1 => "https://megacloud.tv/js/player/a/prod/e1-player.min.js",
            PlayerVariant::E4 => "https://rabbitstream.net/js/player/prod/e4-player.min.js",
            PlayerVariant::E6 => "https://rapid-cloud.co/js/player/prod/e6-player-v2.min.js",
        }
    }
}

impl Default for PlayerVariant {
    fn default() -> Self {
        PlayerVariant::E4
    }
}

impl fmt::Display for PlayerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerVariant {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "e1" => Ok(PlayerVariant::E1),
            "e4" => Ok(PlayerVariant::E4),
            "e6" => Ok(PlayerVariant::E6),
            other => Err(ResolveError::InvalidVariant(other.to_string())),
        }
    }
}

/// Supplies player script text for a variant
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// Fetch the script text for a variant
    async fn fetch_script(&self, variant: PlayerVariant) -> Result<String, ResolveError>;

    /// Forget any cached copy so the next fetch sees a fresh script
    async fn invalidate(&self, _variant: PlayerVariant) {}
}

/// Script text known up front, e.g. read from a local file
#[derive(Debug, Clone)]
pub struct StaticScript {
    script: String,
}

impl StaticScript {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl ScriptSource for StaticScript {
    async fn fetch_script(&self, _variant: PlayerVariant) -> Result<String, ResolveError> {
        Ok(self.script.clone())
    }
}
