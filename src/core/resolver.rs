//! End-to-end resolution: player script + encrypted payload to JSON

use crate::core::decrypt::SaltedPayload;
use crate::core::key::{derive_key, extract_key};
use crate::core::table::{normalize, parse_extraction_key, ExtractionTable};
use crate::error::ResolveError;
use crate::platform::player::{PlayerVariant, ScriptSource};
use crate::platform::sources::{ResolvedSources, SourcesResponse};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Recover the extraction table from a player script
pub fn discover_table(script: &str) -> Result<ExtractionTable, ResolveError> {
    let pairs = parse_extraction_key(script)?;
    normalize(&pairs)
}

/// Decrypt a payload with an already discovered table
pub fn decrypt_with_table(encrypted: &str, table: &ExtractionTable) -> Result<Value, ResolveError> {
    let (secret, remainder) = extract_key(encrypted, table)?;
    let payload = SaltedPayload::decode(&remainder)?;
    let key = derive_key(secret.as_bytes(), payload.salt());
    payload.decrypt_json(&key)
}

/// Run the whole pipeline on a script already in hand
pub fn resolve(script: &str, encrypted: &str) -> Result<Value, ResolveError> {
    let table = discover_table(script)?;
    decrypt_with_table(encrypted, &table)
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Refetch the script once when decryption fails with a stale key
    pub refresh_on_stale_key: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            refresh_on_stale_key: true,
        }
    }
}

/// Fetches player scripts and decrypts source payloads
pub struct Resolver {
    source: Arc<dyn ScriptSource>,
    options: ResolverOptions,
}

impl Resolver {
    /// Create a resolver over a script source
    pub fn new(source: impl ScriptSource + 'static) -> Self {
        Self::with_source(Arc::new(source))
    }

    /// Create a resolver sharing an existing script source
    pub fn with_source(source: Arc<dyn ScriptSource>) -> Self {
        Self {
            source,
            options: ResolverOptions::default(),
        }
    }

    /// Set whether a stale key triggers one refetch of the script
    pub fn with_refresh_on_stale_key(mut self, refresh: bool) -> Self {
        self.options.refresh_on_stale_key = refresh;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Fetch the player script and recover its extraction table
    pub async fn find_table(&self, variant: PlayerVariant) -> Result<ExtractionTable, ResolveError> {
        let started = Instant::now();
        let script = self.source.fetch_script(variant).await?;
        let table = discover_table(&script)?;

        info!(
            "Found key in {:.4} seconds: {}",
            started.elapsed().as_secs_f64(),
            table
        );
        Ok(table)
    }

    /// Decrypt an encrypted source payload for a player variant
    pub async fn get_cdn(&self, encrypted: &str, variant: PlayerVariant) -> Result<Value, ResolveError> {
        let table = self.find_table(variant).await?;
        match decrypt_with_table(encrypted, &table) {
            Err(error) if error.is_stale_key() && self.options.refresh_on_stale_key => {
                warn!("Decryption failed ({}), refetching {} player", error, variant);
                self.source.invalidate(variant).await;

                let fresh = self.find_table(variant).await?;
                if fresh == table {
                    debug!("Player script unchanged after refetch");
                    return Err(error);
                }
                decrypt_with_table(encrypted, &fresh)
            }
            result => result,
        }
    }

    /// Decode a `getSources` response, decrypting its sources when needed
    pub async fn resolve_response(
        &self,
        response: SourcesResponse,
        variant: PlayerVariant,
    ) -> Result<ResolvedSources, ResolveError> {
        let sources = match response.plain_sources()? {
            Some(sources) => sources,
            None => {
                let encrypted = response.ciphertext().unwrap_or_default().to_string();
                self.get_cdn(&encrypted, variant).await?
            }
        };
        Ok(response.into_resolved(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decrypt::tests::seal;
    use crate::platform::player::StaticScript;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SCRIPT: &str = concat!(
        "var _0x1a=0x4,_0x1b=0x6;",
        "function d(i){var s,l;switch(i){",
        "case 0x0:s=_0x1b,l=_0x1c;break;",
        "case 0x1:s=_0x1a,l=_0x1b;break;",
        "}return[s,l]}",
        "_0x1a=0x1;_0x1b=0x2;var _0x1c=0x3;",
        "this.partKeyStartPosition=d(0x0);",
    );

    const SALT: [u8; 8] = *b"saltsalt";
    const PLAINTEXT: &str = r#"[{"file":"https://cdn.example/hls/master.m3u8","type":"hls"}]"#;

    /// Insert key fragments so that `extract_key` removes exactly them
    fn embed(remainder: &str, table: &ExtractionTable, secret: &str) -> String {
        let mut fragments = Vec::new();
        let mut drift = 0;
        let mut consumed = 0;
        for offset in table {
            let fragment = &secret[consumed..consumed + offset.len()];
            fragments.push((offset.start - drift, fragment));
            consumed += offset.len();
            drift += offset.len();
        }

        let mut text = remainder.to_string();
        for (position, fragment) in fragments.into_iter().rev() {
            text.insert_str(position, fragment);
        }
        text
    }

    fn encrypted_for(script: &str, secret: &str, plaintext: &str) -> String {
        let table = discover_table(script).unwrap();
        let armored = seal(plaintext.as_bytes(), secret.as_bytes(), &SALT);
        embed(&armored, &table, secret)
    }

    #[test]
    fn test_discover_table() {
        let table = discover_table(SCRIPT).unwrap();
        assert_eq!(table.to_string(), "[[2, 5], [4, 6]]");
    }

    #[test]
    fn test_resolve_end_to_end() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let table = discover_table(SCRIPT).unwrap();
        let (secret, _) = extract_key(&encrypted, &table).unwrap();
        assert_eq!(secret, "k3y9Z");

        let value = resolve(SCRIPT, &encrypted).unwrap();
        assert_eq!(value[0]["type"], "hls");
        assert_eq!(value, serde_json::from_str::<Value>(PLAINTEXT).unwrap());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let first = resolve(SCRIPT, &encrypted).unwrap();
        let second = resolve(SCRIPT, &encrypted).unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_payload_is_sliced_as_given() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let table = discover_table(SCRIPT).unwrap();

        let padded = format!("  {}", encrypted);
        let (secret, _) = extract_key(&padded, &table).unwrap();
        assert_ne!(secret, "k3y9Z");
        assert!(decrypt_with_table(&padded, &table).is_err());
    }

    #[test]
    fn test_resolve_without_switch() {
        let script = SCRIPT.replace("switch", "select");
        assert!(matches!(
            resolve(&script, "irrelevant"),
            Err(ResolveError::StructureNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_with_wrong_table() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let other = SCRIPT.replace("_0x1a=0x1;", "_0x1a=0x9;");
        let err = resolve(&other, &encrypted).unwrap_err();
        assert!(err.is_stale_key());
    }

    #[test]
    fn test_offsets_beyond_payload() {
        let script = SCRIPT.replace("_0x1b=0x2;", "_0x1b=0xfff;");
        assert!(matches!(
            resolve(&script, "U2FsdGVk"),
            Err(ResolveError::OffsetOutOfRange(_))
        ));
    }

    #[tokio::test]
    async fn test_get_cdn_with_static_script() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let resolver = Resolver::new(StaticScript::new(SCRIPT));
        let value = resolver.get_cdn(&encrypted, PlayerVariant::E4).await.unwrap();
        assert_eq!(value[0]["file"], "https://cdn.example/hls/master.m3u8");
    }

    /// Serves an outdated script until invalidated
    struct RotatingSource {
        scripts: Mutex<Vec<String>>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ScriptSource for RotatingSource {
        async fn fetch_script(&self, _variant: PlayerVariant) -> Result<String, ResolveError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let scripts = self.scripts.lock().unwrap();
            Ok(scripts[0].clone())
        }

        async fn invalidate(&self, _variant: PlayerVariant) {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.len() > 1 {
                scripts.remove(0);
            }
        }
    }

    #[tokio::test]
    async fn test_get_cdn_refetches_on_stale_key() {
        let current = SCRIPT.to_string();
        let outdated = SCRIPT.replace("_0x1a=0x1;", "_0x1a=0x7;");
        let encrypted = encrypted_for(&current, "k3y9Z", PLAINTEXT);

        let source = Arc::new(RotatingSource {
            scripts: Mutex::new(vec![outdated, current]),
            fetches: AtomicUsize::new(0),
        });
        let resolver = Resolver::with_source(source.clone());

        let value = resolver.get_cdn(&encrypted, PlayerVariant::E1).await.unwrap();
        assert_eq!(value[0]["type"], "hls");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_cdn_without_refresh() {
        let current = SCRIPT.to_string();
        let outdated = SCRIPT.replace("_0x1a=0x1;", "_0x1a=0x7;");
        let encrypted = encrypted_for(&current, "k3y9Z", PLAINTEXT);

        let source = Arc::new(RotatingSource {
            scripts: Mutex::new(vec![outdated, current]),
            fetches: AtomicUsize::new(0),
        });
        let resolver = Resolver::with_source(source.clone()).with_refresh_on_stale_key(false);
        assert!(!resolver.options().refresh_on_stale_key);

        assert!(resolver.get_cdn(&encrypted, PlayerVariant::E1).await.is_err());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_response() {
        let encrypted = encrypted_for(SCRIPT, "k3y9Z", PLAINTEXT);
        let body = serde_json::json!({
            "sources": encrypted,
            "tracks": [{"file": "en.vtt", "kind": "captions"}],
            "encrypted": true,
            "server": 4,
        })
        .to_string();

        let resolver = Resolver::new(StaticScript::new(SCRIPT));
        let resolved = resolver
            .resolve_response(SourcesResponse::parse(&body).unwrap(), PlayerVariant::E6)
            .await
            .unwrap();

        assert_eq!(resolved.sources[0]["type"], "hls");
        assert_eq!(resolved.tracks[0]["kind"], "captions");
        assert_eq!(resolved.server, Some(4));
    }

    #[tokio::test]
    async fn test_resolve_plain_response_skips_script() {
        let resolver = Resolver::new(StaticScript::new("no structure here"));
        let body = r#"{"sources":[{"file":"a.m3u8"}],"encrypted":false}"#;
        let resolved = resolver
            .resolve_response(SourcesResponse::parse(body).unwrap(), PlayerVariant::E4)
            .await
            .unwrap();
        assert_eq!(resolved.sources[0]["file"], "a.m3u8");
    }
}
