//! Caching of fetched player scripts

use moka::future::Cache;
use std::time::Duration;

/// Default lifetime of a cached player script
pub const DEFAULT_SCRIPT_TTL: Duration = Duration::from_secs(600);

/// High-performance async cache using moka
pub type AsyncCache<K, V> = Cache<K, V>;

/// Create a new async cache with TTL
pub fn new_async_cache<K, V>(ttl: Duration) -> AsyncCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder().time_to_live(ttl).build()
}

/// Player script cache keyed by script URL
///
/// Players are redeployed far less often than payloads are resolved, so a
/// script is kept for a short TTL and dropped early when its key goes stale.
#[derive(Clone)]
pub struct ScriptCache {
    scripts: AsyncCache<String, String>,
    ttl: Duration,
}

impl ScriptCache {
    /// Create a script cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SCRIPT_TTL)
    }

    /// Create a script cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            scripts: new_async_cache(ttl),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        self.scripts.get(url).await
    }

    pub async fn insert(&self, url: &str, script: String) {
        self.scripts.insert(url.to_string(), script).await;
    }

    pub async fn invalidate(&self, url: &str) {
        self.scripts.invalidate(url).await;
    }

    /// Number of cached scripts, after pending evictions are applied
    pub async fn len(&self) -> u64 {
        self.scripts.run_pending_tasks().await;
        self.scripts.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ScriptCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_cache() {
        let cache = ScriptCache::new();
        assert_eq!(cache.ttl(), DEFAULT_SCRIPT_TTL);
        assert!(cache.get("https://example.com/e4.js").await.is_none());

        cache
            .insert("https://example.com/e4.js", "switch".to_string())
            .await;
        assert_eq!(
            cache.get("https://example.com/e4.js").await,
            Some("switch".to_string())
        );
        assert_eq!(cache.len().await, 1);

        cache.invalidate("https://example.com/e4.js").await;
        assert!(cache.get("https://example.com/e4.js").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_script_cache_expiration() {
        let cache = ScriptCache::with_ttl(Duration::from_millis(50));
        cache
            .insert("https://example.com/e1.js", "script".to_string())
            .await;
        assert!(cache.get("https://example.com/e1.js").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("https://example.com/e1.js").await.is_none());
    }
}
