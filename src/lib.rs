//! # cdn-resolver
//!
//! Recovers the decryption key a web player hides inside its minified script
//! and uses it to decrypt the source listing its backend returns.
//!
//! ## Pipeline
//!
//! 1. Parse the player script for the case assignments that describe where
//!    key fragments sit inside the ciphertext
//! 2. Turn them into absolute offsets with a running sum
//! 3. Cut the key out of the ciphertext
//! 4. Derive an AES-256 key and IV from the key and the payload salt
//! 5. Decrypt, unpad and parse the JSON result
//!
//! ## Example
//!
//! ```rust,no_run
//! use cdn_resolver::{PlayerClient, PlayerVariant, Resolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Resolver::new(PlayerClient::new()?);
//!     let sources = resolver.get_cdn("ENCRYPTED_SOURCES", PlayerVariant::E4).await?;
//!     println!("{}", sources);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{
    decrypt_payload, derive_key, discover_table, extract_key, normalize, parse_extraction_key,
    resolve, DerivedKey, ExtractionTable, Offset, RawIndexPair, Resolver,
};
pub use crate::error::ResolveError;
pub use crate::platform::{PlayerClient, PlayerVariant, ScriptSource, SourcesResponse, StaticScript};

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolveError>;
