use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::domain::query::EntityType;

use super::constants::{
    ENV_CONFIG, ENV_CONSISTENCY_BASE_DELAY_MS, ENV_CONSISTENCY_MAX_ATTEMPTS, ENV_DEBUG,
    ENV_GRAPH_DATABASE, ENV_GRAPH_PASSWORD, ENV_GRAPH_TIMEOUT_SECS, ENV_GRAPH_URL,
    ENV_GRAPH_USERNAME, ENV_HOST, ENV_PORT, ENV_QUERY_DEFAULT_LIMIT, ENV_QUERY_MAX_LIMIT,
};

#[derive(Parser)]
#[command(name = "crmgraph")]
#[command(version, about = "Filter and pagination query service for a CRM graph", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Neo4j HTTP endpoint (e.g. http://localhost:7474)
    #[arg(long, global = true, env = ENV_GRAPH_URL)]
    pub graph_url: Option<String>,

    /// Neo4j database name
    #[arg(long, global = true, env = ENV_GRAPH_DATABASE)]
    pub graph_database: Option<String>,

    /// Neo4j username
    #[arg(long, global = true, env = ENV_GRAPH_USERNAME)]
    pub graph_username: Option<String>,

    /// Neo4j password
    #[arg(long, global = true, env = ENV_GRAPH_PASSWORD, hide_env_values = true)]
    pub graph_password: Option<String>,

    /// Per-request timeout against the graph store, in seconds
    #[arg(long, global = true, env = ENV_GRAPH_TIMEOUT_SECS)]
    pub graph_timeout_secs: Option<u64>,

    /// Visibility probes after a write
    #[arg(long, global = true, env = ENV_CONSISTENCY_MAX_ATTEMPTS)]
    pub consistency_max_attempts: Option<u32>,

    /// Base delay between visibility probes, in milliseconds
    #[arg(long, global = true, env = ENV_CONSISTENCY_BASE_DELAY_MS)]
    pub consistency_base_delay_ms: Option<u64>,

    /// Page size when a request names none
    #[arg(long, global = true, env = ENV_QUERY_DEFAULT_LIMIT)]
    pub query_default_limit: Option<i64>,

    /// Largest accepted page size
    #[arg(long, global = true, env = ENV_QUERY_MAX_LIMIT)]
    pub query_max_limit: Option<i64>,
}

/// Parse entity type from CLI string
fn parse_entity(s: &str) -> Result<EntityType, String> {
    s.parse()
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the HTTP server (default command)
    Serve,
    /// Print the Cypher statements and parameters for a search request
    Compile {
        /// Tenant name
        #[arg(long, short)]
        tenant: String,
        /// Entity type (organization, contact, user, meeting, contract, invoice)
        #[arg(value_parser = parse_entity)]
        entity: EntityType,
        /// Search request as JSON: {"filter": .., "sort": [..], "search": .., "page": .., "limit": ..}
        #[arg(default_value = "{}")]
        request: String,
    },
    /// Wait until a node is visible (or gone) in the graph store
    Wait {
        /// Tenant name
        #[arg(long, short)]
        tenant: String,
        /// Entity type of the node
        #[arg(value_parser = parse_entity)]
        entity: EntityType,
        /// Node id
        id: String,
        /// Wait for deletion instead of creation
        #[arg(long)]
        deleted: bool,
        /// Overall time budget in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub graph_url: Option<String>,
    pub graph_database: Option<String>,
    pub graph_username: Option<String>,
    pub graph_password: Option<String>,
    pub graph_timeout_secs: Option<u64>,
    pub consistency_max_attempts: Option<u32>,
    pub consistency_base_delay_ms: Option<u64>,
    pub query_default_limit: Option<i64>,
    pub query_max_limit: Option<i64>,
}

impl Cli {
    /// Split parsed arguments into config overrides and the subcommand
    pub fn into_parts(self) -> (CliConfig, Option<Commands>) {
        let config = CliConfig {
            host: self.host,
            port: self.port,
            debug: self.debug,
            config: self.config,
            graph_url: self.graph_url,
            graph_database: self.graph_database,
            graph_username: self.graph_username,
            graph_password: self.graph_password,
            graph_timeout_secs: self.graph_timeout_secs,
            consistency_max_attempts: self.consistency_max_attempts,
            consistency_base_delay_ms: self.consistency_base_delay_ms,
            query_default_limit: self.query_default_limit,
            query_max_limit: self.query_max_limit,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    Cli::parse().into_parts()
}
