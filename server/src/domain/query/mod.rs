//! Filter and sort compilation for graph queries
//!
//! Turns client filter trees and sort directives into parameterized Cypher
//! fragments, resolving logical field names through static entity metadata.
//!
//! ## Usage
//!
//! ```
//! use crmgraph_server::domain::query::{EntityType, Filter, compile_filter};
//!
//! let json = r#"{"filter": {"property": "NAME", "operation": "CONTAINS", "value": {"str": "acme"}}}"#;
//! let filter: Filter = serde_json::from_str(json).unwrap();
//! let compiled = compile_filter(Some(&filter), EntityType::Organization).unwrap().unwrap();
//! let fragment = compiled.to_cypher("org", "org_param_");
//! assert_eq!(fragment.cypher, "toLower(org.name) CONTAINS toLower($org_param_1)");
//! ```

mod error;
mod filter;
mod metadata;
mod pagination;
mod sort;
mod types;

pub use error::{MALFORMED_FILTER, QueryError};
pub use filter::{
    CompiledFilter, CompiledFilterItem, FilterFragment, LogicalOperator, compile_filter,
};
pub use metadata::{EntityType, PropertyMetadata};
pub use pagination::Pagination;
pub use sort::{CompiledSort, MultiEntitySort, SortDefault, SortEntity, SortKey, compile_sort};
pub use types::{
    AnyTypeValue, ComparisonOperator, Filter, FilterItem, FilterNode, FilterShape, SortBy,
    SortDirection, TypedValue,
};
