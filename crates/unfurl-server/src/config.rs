//! Server configuration: defaults, then an optional file, then `UNFURL__*`
//! environment variables.

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, Map, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use unfurl_db::PoolOptions;
use unfurl_resolvers::ResolverSettings;

const ENV_PREFIX: &str = "UNFURL";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/unfurl".to_string(),
            max_connections: 20,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub max_content_length: u64,
    pub max_thumbnail_size: u32,
    pub enable_animated_thumbnails: bool,
    pub request_timeout_secs: u64,
    pub ignored_hosts: Vec<String>,
    pub default_link_cache_secs: u64,
    pub thumbnail_cache_secs: u64,
    pub emote_cache_secs: u64,
    pub wikipedia_cache_secs: u64,
    pub track_cache_secs: u64,
    pub tweet_cache_secs: u64,
    pub twitter_bearer_token: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let defaults = ResolverSettings::default();
        Self {
            max_content_length: defaults.max_content_length,
            max_thumbnail_size: defaults.max_thumbnail_size,
            enable_animated_thumbnails: defaults.enable_animated_thumbnails,
            request_timeout_secs: defaults.request_timeout.as_secs(),
            ignored_hosts: defaults.ignored_hosts,
            default_link_cache_secs: defaults.default_link_cache.as_secs(),
            thumbnail_cache_secs: defaults.thumbnail_cache.as_secs(),
            emote_cache_secs: defaults.emote_cache.as_secs(),
            wikipedia_cache_secs: defaults.wikipedia_cache.as_secs(),
            track_cache_secs: defaults.track_cache.as_secs(),
            tweet_cache_secs: defaults.tweet_cache.as_secs(),
            twitter_bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Public URL of this service.
    pub base_url: String,
    pub database: DatabaseConfig,
    pub log: LogConfig,
    pub resolver: ResolverConfig,
    /// Seconds between expired-row sweeps; 0 disables the sweep.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1234".to_string(),
            base_url: ResolverSettings::default().base_url,
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
            resolver: ResolverConfig::default(),
            sweep_interval_secs: 300,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        Self::finish(builder.add_source(environment(None)))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder().add_source(
            Config::try_from(&Self::default()).context("Failed to serialize default configuration")?,
        ))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        let resolver = &self.resolver;
        ResolverSettings {
            base_url: self.base_url.clone(),
            max_content_length: resolver.max_content_length,
            max_thumbnail_size: resolver.max_thumbnail_size,
            enable_animated_thumbnails: resolver.enable_animated_thumbnails,
            request_timeout: Duration::from_secs(resolver.request_timeout_secs),
            ignored_hosts: resolver.ignored_hosts.clone(),
            default_link_cache: Duration::from_secs(resolver.default_link_cache_secs),
            thumbnail_cache: Duration::from_secs(resolver.thumbnail_cache_secs),
            emote_cache: Duration::from_secs(resolver.emote_cache_secs),
            wikipedia_cache: Duration::from_secs(resolver.wikipedia_cache_secs),
            track_cache: Duration::from_secs(resolver.track_cache_secs),
            tweet_cache: Duration::from_secs(resolver.tweet_cache_secs),
            twitter_bearer_token: resolver
                .twitter_bearer_token
                .clone()
                .filter(|token| !token.is_empty()),
            ..ResolverSettings::default()
        }
    }
}

/// `UNFURL__DATABASE__URL` sets `database.url`. `source` replaces the
/// process environment in tests.
fn environment(source: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("resolver.ignored_hosts")
        .source(source)
}
