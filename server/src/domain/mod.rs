//! Domain logic for graph queries
//!
//! - `query` - Filter/sort compilation into Cypher fragments, pagination
//! - `search` - Tenant-scoped search composed from compiled fragments

pub mod query;
pub mod search;

pub use search::{CompiledQuery, QueryLimits, SearchError, SearchRequest, SearchService};
