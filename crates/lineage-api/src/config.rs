use config::{Config as ConfigLoader, ConfigError, Environment, File};
use lineage_graph::{DomainAdapter, DomainKind};
use lineage_kg::WikidataConfig;
use lineage_types::TraversalConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub wikidata: WikidataSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    pub domain: DomainKind,
    /// Depth used when a `start` command carries no depth
    pub default_depth: u32,
    /// Override of the domain's accepted depth range
    #[serde(default)]
    pub min_depth: Option<u32>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    pub fetch_timeout_ms: u64,
    pub candidate_limit: usize,
    /// Depth used by `expand_node`
    pub expand_depth: u32,
    pub channel_capacity: usize,
}

impl ExplorerConfig {
    pub fn adapter(&self) -> DomainAdapter {
        let adapter = self.domain.adapter();
        let min = self.min_depth.unwrap_or(*adapter.depth_range.start());
        let max = self.max_depth.unwrap_or(*adapter.depth_range.end());
        adapter.with_depth_range(min..=max)
    }

    pub fn traversal_config(&self) -> TraversalConfig {
        TraversalConfig::new()
            .with_fetch_timeout(Duration::from_millis(self.fetch_timeout_ms))
            .with_channel_capacity(self.channel_capacity)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikidataSettings {
    pub wikipedia_api: String,
    pub wikidata_api: String,
    pub sparql_endpoint: String,
    pub user_agent: String,
    pub language: String,
    pub timeout_ms: u64,
    pub min_interval_ms: u64,
    pub reverse_limit: usize,
    pub label_cache_size: usize,
}

impl Default for WikidataSettings {
    fn default() -> Self {
        let defaults = WikidataConfig::default();
        Self {
            wikipedia_api: defaults.wikipedia_api,
            wikidata_api: defaults.wikidata_api,
            sparql_endpoint: defaults.sparql_endpoint,
            user_agent: defaults.user_agent,
            language: defaults.language,
            timeout_ms: defaults.timeout.as_millis() as u64,
            min_interval_ms: defaults.min_interval.as_millis() as u64,
            reverse_limit: defaults.reverse_limit,
            label_cache_size: 10_000,
        }
    }
}

impl From<&WikidataSettings> for WikidataConfig {
    fn from(settings: &WikidataSettings) -> Self {
        Self {
            wikipedia_api: settings.wikipedia_api.clone(),
            wikidata_api: settings.wikidata_api.clone(),
            sparql_endpoint: settings.sparql_endpoint.clone(),
            user_agent: settings.user_agent.clone(),
            language: settings.language.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
            min_interval: Duration::from_millis(settings.min_interval_ms),
            reverse_limit: settings.reverse_limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `LINEAGE_<SECTION>__<KEY>` environment variables
    /// 4. Shorthand variables: SERVER_HOST, SERVER_PORT, EXPLORER_DOMAIN,
    ///    WIKIDATA_USER_AGENT, LOG_LEVEL, LOG_FORMAT
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("LINEAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.apply_env_overrides()?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Message(format!("SERVER_PORT is not a port: {}", port)))?;
        }
        if let Ok(domain) = std::env::var("EXPLORER_DOMAIN") {
            self.explorer.domain = domain.parse().map_err(ConfigError::Message)?;
        }
        if let Ok(user_agent) = std::env::var("WIKIDATA_USER_AGENT") {
            self.wikidata.user_agent = user_agent;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }
}
