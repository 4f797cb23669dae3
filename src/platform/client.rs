//! HTTP client for player script requests

use crate::error::ResolveError;
use crate::platform::player::{PlayerVariant, ScriptSource};
use crate::utils::cache::{ScriptCache, DEFAULT_SCRIPT_TTL};
use crate::utils::retry::{RetryConfigBuilder, RetryExecutor};
use async_trait::async_trait;
use reqwest::{header, Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retries
    pub max_retries: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// Referer header; defaults to the origin of the script URL
    pub referer: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// How long a fetched script stays cached
    pub cache_ttl: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            user_agent: None,
            referer: None,
            proxy_url: None,
            cache_ttl: DEFAULT_SCRIPT_TTL,
        }
    }
}

/// Fetches player scripts over HTTP with caching and retries
pub struct PlayerClient {
    client: Client,
    config: HttpClientConfig,
    cache: ScriptCache,
    retry: RetryExecutor,
    script_urls: HashMap<PlayerVariant, Url>,
}

impl PlayerClient {
    /// Create a new player client with default configuration
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new player client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ResolveError> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        let retry = RetryExecutor::with_config(
            RetryConfigBuilder::new()
                .max_retries(config.max_retries)
                .build(),
        );

        Ok(Self {
            client: builder.build()?,
            cache: ScriptCache::with_ttl(config.cache_ttl),
            retry,
            script_urls: HashMap::new(),
            config,
        })
    }

    /// Serve a variant from a different URL (mirrors, local servers)
    pub fn with_script_url(mut self, variant: PlayerVariant, url: &str) -> Result<Self, ResolveError> {
        self.script_urls.insert(variant, Url::parse(url)?);
        Ok(self)
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// URL the script for `variant` is fetched from
    pub fn script_url(&self, variant: PlayerVariant) -> Result<Url, ResolveError> {
        match self.script_urls.get(&variant) {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(variant.script_url())?),
        }
    }

    /// Fetch a script, serving from cache when possible
    pub async fn fetch_url(&self, url: &Url) -> Result<String, ResolveError> {
        if let Some(cached) = self.cache.get(url.as_str()).await {
            debug!("Player script cache hit for {}", url);
            return Ok(cached);
        }

        let referer = match &self.config.referer {
            Some(referer) => referer.clone(),
            None => format!("{}/", url.origin().ascii_serialization()),
        };

        let script = self
            .retry
            .execute(|| {
                let client = self.client.clone();
                let url = url.clone();
                let referer = referer.clone();
                Box::pin(async move { fetch_once(&client, url, &referer).await })
            })
            .await?;

        info!("Fetched player script from {} ({} bytes)", url, script.len());
        self.cache.insert(url.as_str(), script.clone()).await;
        Ok(script)
    }

    /// Number of scripts currently cached
    pub async fn cached_scripts(&self) -> u64 {
        self.cache.len().await
    }
}

async fn fetch_once(client: &Client, url: Url, referer: &str) -> Result<String, ResolveError> {
    debug!("GET {}", url);
    let response = client
        .get(url.clone())
        .header(header::ACCEPT, "*/*")
        .header(header::REFERER, referer)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text().await?)
}

#[async_trait]
impl ScriptSource for PlayerClient {
    async fn fetch_script(&self, variant: PlayerVariant) -> Result<String, ResolveError> {
        let url = self.script_url(variant)?;
        self.fetch_url(&url).await
    }

    async fn invalidate(&self, variant: PlayerVariant) {
        if let Ok(url) = self.script_url(variant) {
            debug!("Dropping cached {} player script", variant);
            self.cache.invalidate(url.as_str()).await;
        }
    }
}
