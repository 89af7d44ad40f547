// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths, identifiers, and log targets)
pub const APP_NAME_LOWER: &str = "crmgraph";

/// Log target of the library crate
pub const LOG_TARGET: &str = "crmgraph_server";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".crmgraph";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "crmgraph.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "CRMGRAPH_CONFIG";

// =============================================================================
// Environment Variables - General
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "CRMGRAPH_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CRMGRAPH_LOG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "CRMGRAPH_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "CRMGRAPH_PORT";

// =============================================================================
// Environment Variables - Graph Store
// =============================================================================

pub const ENV_GRAPH_URL: &str = "CRMGRAPH_GRAPH_URL";
pub const ENV_GRAPH_DATABASE: &str = "CRMGRAPH_GRAPH_DATABASE";
pub const ENV_GRAPH_USERNAME: &str = "CRMGRAPH_GRAPH_USERNAME";
pub const ENV_GRAPH_PASSWORD: &str = "CRMGRAPH_GRAPH_PASSWORD";
pub const ENV_GRAPH_TIMEOUT_SECS: &str = "CRMGRAPH_GRAPH_TIMEOUT_SECS";

// =============================================================================
// Environment Variables - Consistency Waiter
// =============================================================================

pub const ENV_CONSISTENCY_MAX_ATTEMPTS: &str = "CRMGRAPH_CONSISTENCY_MAX_ATTEMPTS";
pub const ENV_CONSISTENCY_BASE_DELAY_MS: &str = "CRMGRAPH_CONSISTENCY_BASE_DELAY_MS";

// =============================================================================
// Environment Variables - Query
// =============================================================================

pub const ENV_QUERY_DEFAULT_LIMIT: &str = "CRMGRAPH_QUERY_DEFAULT_LIMIT";
pub const ENV_QUERY_MAX_LIMIT: &str = "CRMGRAPH_QUERY_MAX_LIMIT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default body limit for API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Graph Store Defaults
// =============================================================================

/// Default Neo4j HTTP endpoint
pub const DEFAULT_GRAPH_URL: &str = "http://localhost:7474";

/// Default Neo4j database name
pub const DEFAULT_GRAPH_DATABASE: &str = "neo4j";

/// Default per-request timeout in seconds
pub const DEFAULT_GRAPH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Consistency Waiter Defaults
// =============================================================================

/// Default number of visibility probes after a write
pub const DEFAULT_CONSISTENCY_MAX_ATTEMPTS: u32 = 5;

/// Default delay after the first failed probe; attempt `n` waits `n` times this
pub const DEFAULT_CONSISTENCY_BASE_DELAY_MS: u64 = 100;

// =============================================================================
// Query Defaults
// =============================================================================

/// Page size when the request names none
pub const DEFAULT_QUERY_LIMIT: i64 = 20;

/// Largest accepted page size
pub const MAX_QUERY_LIMIT: i64 = 100;
