//! Command line argument parsing

use crate::error::ResolveError;
use crate::platform::client::HttpClientConfig;
use crate::platform::player::PlayerVariant;
use crate::platform::sources::SourcesResponse;
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Recover a player's embedded key and decrypt its source payload
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Encrypted sources string or getSources JSON response ('-' reads stdin)
    pub payload: Option<String>,

    /// Read the payload from a file
    #[arg(long, value_name = "PATH", conflicts_with = "payload")]
    pub payload_file: Option<PathBuf>,

    /// Player variant the payload belongs to
    #[arg(long, value_enum, default_value = "e4")]
    pub variant: Variant,

    /// Use a local player script instead of fetching it
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Fetch the player script from this URL instead of the variant default
    #[arg(long, value_name = "URL", conflicts_with = "script")]
    pub player_url: Option<String>,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// HTTP retries for transient errors
    #[arg(long, default_value = "3")]
    pub retries: u32,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Override Referer header
    #[arg(long, value_name = "URL")]
    pub referer: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Print the extraction table and exit
    #[arg(long)]
    pub table_only: bool,

    /// Do not refetch the player script when its key looks stale
    #[arg(long)]
    pub no_refresh: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Player variant
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum Variant {
    /// megacloud e1 player
    E1,
    /// rabbitstream e4 player
    E4,
    /// rapid-cloud e6 player
    E6,
}

impl From<Variant> for PlayerVariant {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::E1 => PlayerVariant::E1,
            Variant::E4 => PlayerVariant::E4,
            Variant::E6 => PlayerVariant::E6,
        }
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Selected player variant
    pub fn player_variant(&self) -> PlayerVariant {
        self.variant.into()
    }

    /// HTTP configuration for the script fetcher
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.timeout_duration(),
            max_retries: self.retries,
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
            proxy_url: self.proxy.clone(),
            ..Default::default()
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Read the payload text from the argument, stdin or a file
    pub fn read_payload(&self) -> Result<Option<String>, ResolveError> {
        if let Some(path) = &self.payload_file {
            return Ok(Some(std::fs::read_to_string(path)?));
        }

        match self.payload.as_deref() {
            Some("-") => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                Ok(Some(buffer))
            }
            Some(payload) => Ok(Some(payload.to_string())),
            None => Ok(None),
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// What the user handed us on the command line
#[derive(Debug, Clone)]
pub enum PayloadInput {
    /// Bare encrypted sources string
    Raw(String),
    /// Full getSources response
    Response(SourcesResponse),
}

impl PayloadInput {
    /// JSON objects are treated as getSources responses, anything else as ciphertext
    pub fn parse(text: &str) -> Result<Self, ResolveError> {
        let text = text.trim();
        if text.starts_with('{') {
            Ok(PayloadInput::Response(SourcesResponse::parse(text)?))
        } else {
            Ok(PayloadInput::Raw(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["cdn-resolver", "U2FsdGVk"]).unwrap();
        assert_eq!(args.payload.as_deref(), Some("U2FsdGVk"));
        assert_eq!(args.player_variant(), PlayerVariant::E4);
        assert_eq!(args.timeout_duration(), Duration::from_secs(30));
        assert_eq!(args.retries, 3);
        assert_eq!(args.verbosity_level(), VerbosityLevel::Normal);
        assert!(!args.table_only);
    }

    #[test]
    fn test_args_http_config() {
        let args = Args::try_parse_from([
            "cdn-resolver",
            "--variant",
            "e6",
            "--timeout",
            "1m",
            "--retries",
            "5",
            "--referer",
            "https://example.com/",
            "--table-only",
        ])
        .unwrap();

        assert_eq!(args.player_variant(), PlayerVariant::E6);
        let config = args.http_config();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.referer.as_deref(), Some("https://example.com/"));
        assert!(config.user_agent.is_none());
        assert!(args.table_only);
    }

    #[test]
    fn test_args_conflicts() {
        assert!(Args::try_parse_from(["cdn-resolver", "abc", "--payload-file", "p.txt"]).is_err());
        assert!(Args::try_parse_from(["cdn-resolver", "-v", "-q"]).is_err());
        assert!(Args::try_parse_from(["cdn-resolver", "--variant", "e5"]).is_err());
    }

    #[test]
    fn test_args_verbosity_level() {
        let args = Args::try_parse_from(["cdn-resolver", "-q"]).unwrap();
        assert_eq!(args.verbosity_level(), VerbosityLevel::Quiet);
        assert_eq!(args.verbosity_level().log_filter(), "error");

        let args = Args::try_parse_from(["cdn-resolver", "--verbose"]).unwrap();
        assert_eq!(args.verbosity_level(), VerbosityLevel::Verbose);
        assert_eq!(args.verbosity_level().log_filter(), "debug");
    }

    #[test]
    fn test_read_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "U2FsdGVkX1+payload").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = Args::try_parse_from(["cdn-resolver", "--payload-file", path.as_str()]).unwrap();
        assert_eq!(
            args.read_payload().unwrap().as_deref(),
            Some("U2FsdGVkX1+payload\n")
        );
    }

    #[test]
    fn test_read_payload_missing() {
        let args = Args::try_parse_from(["cdn-resolver", "--table-only"]).unwrap();
        assert!(args.read_payload().unwrap().is_none());

        let args =
            Args::try_parse_from(["cdn-resolver", "--payload-file", "/nonexistent/payload"]).unwrap();
        assert!(matches!(args.read_payload(), Err(ResolveError::IoError(_))));
    }

    #[test]
    fn test_payload_input_parse() {
        match PayloadInput::parse("  U2FsdGVkX1+abc \n").unwrap() {
            PayloadInput::Raw(text) => assert_eq!(text, "U2FsdGVkX1+abc"),
            other => panic!("unexpected {:?}", other),
        }

        match PayloadInput::parse(r#"{"sources":"abc","encrypted":true}"#).unwrap() {
            PayloadInput::Response(response) => assert_eq!(response.ciphertext(), Some("abc")),
            other => panic!("unexpected {:?}", other),
        }

        assert!(PayloadInput::parse("{not json").is_err());
    }
}
