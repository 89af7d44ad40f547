//! Data storage layer
//!
//! - `neo4j` - Graph store client over the Neo4j HTTP API
//! - `traits` - `GraphReader` trait implemented by store clients
//! - `wait` - Read-after-write consistency waiter
//! - `error` - Unified error type for the data layer

pub mod error;
pub mod neo4j;
pub mod traits;
pub mod wait;

pub use error::DataError;
pub use neo4j::Neo4jHttpReader;
pub use traits::{GraphReader, Params, Row};
pub use wait::{ConsistencyWaiter, Expectation, WaitConfig, WaitError, WaitOutcome};
