use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::WaitConfig;
use crate::domain::QueryLimits;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CONSISTENCY_BASE_DELAY_MS,
    DEFAULT_CONSISTENCY_MAX_ATTEMPTS, DEFAULT_GRAPH_DATABASE, DEFAULT_GRAPH_TIMEOUT_SECS,
    DEFAULT_GRAPH_URL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUERY_LIMIT, ENV_GRAPH_URL,
    MAX_QUERY_LIMIT,
};

// =============================================================================
// File Config Structs (for JSON parsing, all fields optional)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Graph store connection section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GraphFileConfig {
    pub url: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Read-after-write polling section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConsistencyFileConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

/// Page size section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub graph: Option<GraphFileConfig>,
    pub consistency: Option<ConsistencyFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        // Debug output skips the graph section so passwords stay out of logs
        tracing::trace!(
            server = ?config.server,
            consistency = ?config.consistency,
            query = ?config.query,
            "Parsed config file"
        );
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(graph) = other.graph {
            let current = self.graph.get_or_insert_with(GraphFileConfig::default);
            if graph.url.is_some() {
                tracing::trace!(url = ?graph.url, "Merging graph.url");
                current.url = graph.url;
            }
            if graph.database.is_some() {
                tracing::trace!(database = ?graph.database, "Merging graph.database");
                current.database = graph.database;
            }
            if graph.username.is_some() {
                tracing::trace!("Merging graph.username");
                current.username = graph.username;
            }
            if graph.password.is_some() {
                tracing::trace!("Merging graph.password");
                current.password = graph.password;
            }
            if graph.timeout_secs.is_some() {
                tracing::trace!(timeout_secs = ?graph.timeout_secs, "Merging graph.timeout_secs");
                current.timeout_secs = graph.timeout_secs;
            }
        }

        if let Some(consistency) = other.consistency {
            let current = self
                .consistency
                .get_or_insert_with(ConsistencyFileConfig::default);
            if consistency.max_attempts.is_some() {
                tracing::trace!(max_attempts = ?consistency.max_attempts, "Merging consistency.max_attempts");
                current.max_attempts = consistency.max_attempts;
            }
            if consistency.base_delay_ms.is_some() {
                tracing::trace!(base_delay_ms = ?consistency.base_delay_ms, "Merging consistency.base_delay_ms");
                current.base_delay_ms = consistency.base_delay_ms;
            }
        }

        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.default_limit.is_some() {
                tracing::trace!(default_limit = ?query.default_limit, "Merging query.default_limit");
                current.default_limit = query.default_limit;
            }
            if query.max_limit.is_some() {
                tracing::trace!(max_limit = ?query.max_limit, "Merging query.max_limit");
                current.max_limit = query.max_limit;
            }
        }

        if other.debug.is_some() {
            tracing::trace!(debug = ?other.debug, "Merging debug");
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Neo4j HTTP endpoint configuration
#[derive(Clone)]
pub struct GraphConfig {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Consistency waiter configuration
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl ConsistencyConfig {
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

/// Page size configuration
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl QueryConfig {
    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub consistency: ConsistencyConfig,
    pub query: QueryConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.crmgraph/crmgraph.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let file_server = file_config.server.unwrap_or_default();
        let file_graph = file_config.graph.unwrap_or_default();
        let file_consistency = file_config.consistency.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let graph = GraphConfig {
            url: cli
                .graph_url
                .clone()
                .or(file_graph.url)
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
            database: cli
                .graph_database
                .clone()
                .or(file_graph.database)
                .unwrap_or_else(|| DEFAULT_GRAPH_DATABASE.to_string()),
            username: cli.graph_username.clone().or(file_graph.username),
            password: cli.graph_password.clone().or(file_graph.password),
            timeout_secs: cli
                .graph_timeout_secs
                .or(file_graph.timeout_secs)
                .unwrap_or(DEFAULT_GRAPH_TIMEOUT_SECS),
        };

        let consistency = ConsistencyConfig {
            max_attempts: cli
                .consistency_max_attempts
                .or(file_consistency.max_attempts)
                .unwrap_or(DEFAULT_CONSISTENCY_MAX_ATTEMPTS),
            base_delay_ms: cli
                .consistency_base_delay_ms
                .or(file_consistency.base_delay_ms)
                .unwrap_or(DEFAULT_CONSISTENCY_BASE_DELAY_MS),
        };

        let query = QueryConfig {
            default_limit: cli
                .query_default_limit
                .or(file_query.default_limit)
                .unwrap_or(DEFAULT_QUERY_LIMIT),
            max_limit: cli
                .query_max_limit
                .or(file_query.max_limit)
                .unwrap_or(MAX_QUERY_LIMIT),
        };

        // --debug can only turn debug on
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            server,
            graph,
            consistency,
            query,
            debug,
        };

        tracing::debug!(config = ?config, "Configuration loaded");
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port 0 would bind to a random port
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be non-zero");
        }

        if self.graph.url.trim().is_empty() {
            anyhow::bail!(
                "Configuration error: graph.url must not be empty. \
                 Set via {} env var or graph.url in config file.",
                ENV_GRAPH_URL
            );
        }
        if !self.graph.url.starts_with("http://") && !self.graph.url.starts_with("https://") {
            anyhow::bail!(
                "Configuration error: graph.url must start with http:// or https://. Got: {}",
                self.graph.url
            );
        }
        if self.graph.database.is_empty() {
            anyhow::bail!("Configuration error: graph.database must not be empty");
        }
        if self.graph.timeout_secs == 0 {
            anyhow::bail!("Configuration error: graph.timeout_secs must be non-zero");
        }

        if self.consistency.max_attempts == 0 {
            anyhow::bail!("Configuration error: consistency.max_attempts must be at least 1");
        }
        if self.consistency.base_delay_ms == 0 {
            anyhow::bail!("Configuration error: consistency.base_delay_ms must be at least 1");
        }

        if self.query.default_limit < 1 {
            anyhow::bail!(
                "Configuration error: query.default_limit must be at least 1 (got {})",
                self.query.default_limit
            );
        }
        if self.query.max_limit < self.query.default_limit {
            anyhow::bail!(
                "Configuration error: query.max_limit ({}) must not be below query.default_limit ({})",
                self.query.max_limit,
                self.query.default_limit
            );
        }

        if self.graph.password.is_some() && self.graph.username.is_none() {
            tracing::warn!("graph.password is set without graph.username and will be ignored");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.crmgraph/crmgraph.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
