//! Graph store access trait
//!
//! Everything above the data layer talks to the graph store through
//! [`GraphReader`], so the HTTP client can be swapped for an in-memory fake.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::data::error::DataError;
use crate::utils::cypher::{quote_identifier, tenant_label};

/// One result row, in column order
pub type Row = Vec<Value>;

/// Statement parameters, keyed by name without the leading `$`
pub type Params = Map<String, Value>;

// ============================================================================
// Graph Reader Trait
// ============================================================================

/// Read access to the graph store
#[async_trait]
pub trait GraphReader: Send + Sync {
    /// Run a read statement and return its rows
    async fn run(&self, statement: &str, params: &Params) -> Result<Vec<Row>, DataError>;

    /// Check whether a tenant-scoped node with the given id is visible
    async fn node_exists(&self, tenant: &str, id: &str, label: &str) -> Result<bool, DataError> {
        let statement = format!(
            "MATCH (n:{} {{id: $id}}) RETURN count(n) > 0",
            quote_identifier(&tenant_label(label, tenant))
        );
        let mut params = Params::new();
        params.insert("id".to_string(), Value::String(id.to_string()));

        let rows = self.run(&statement, &params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}
