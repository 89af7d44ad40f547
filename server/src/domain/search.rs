//! Tenant-scoped entity search
//!
//! Composes a tenant MATCH with the compiled filter, sort, and pagination into
//! a count statement and a page statement, and runs both against the graph
//! store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

use crate::data::{DataError, GraphReader, Params};
use crate::domain::query::{
    CompiledFilter, CompiledFilterItem, CompiledSort, ComparisonOperator, EntityType, Filter,
    LogicalOperator, MultiEntitySort, Pagination, QueryError, SortBy, SortDefault,
    SortDirection, SortEntity, TypedValue, compile_filter, compile_sort,
};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Search request body
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortBy>,
    /// Free-text term matched against every text property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 256, message = "search term must be at most 256 characters"))]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "limit must not be negative"))]
    pub limit: Option<i64>,
}

/// Page size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl QueryLimits {
    fn resolve(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Statements and bindings for one search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub count_statement: String,
    pub page_statement: String,
    pub params: Params,
    pub page: i64,
    pub limit: i64,
    pub skip: i64,
}

/// Invoices sort across the invoice and its contract
fn invoice_sort() -> MultiEntitySort {
    MultiEntitySort::new(vec![
        SortEntity::new("INVOICE", EntityType::Invoice.alias(), EntityType::Invoice),
        SortEntity::new("CONTRACT", EntityType::Contract.alias(), EntityType::Contract)
            .with_default(SortDefault::new(
                "ENDED_AT",
                "date('2100-01-01')",
                "date('1900-01-01')",
            )),
    ])
}

fn default_sort(entity: EntityType) -> SortBy {
    match entity {
        EntityType::Invoice => SortBy::new("INVOICE_DUE_DATE", SortDirection::Desc),
        _ => SortBy::new("CREATED_AT", SortDirection::Desc),
    }
}

fn sort_for(entity: EntityType, rules: &[SortBy]) -> Result<CompiledSort, QueryError> {
    let defaulted;
    let rules = if rules.is_empty() {
        defaulted = [default_sort(entity)];
        &defaulted[..]
    } else {
        rules
    };
    match entity {
        EntityType::Invoice => invoice_sort().compile(rules),
        _ => compile_sort(rules, entity),
    }
}

/// Case-insensitive CONTAINS over every text property, OR-ed together
fn search_filter(entity: EntityType, term: &str) -> Result<Option<CompiledFilter>, QueryError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(None);
    }
    let items = entity
        .searchable()
        .map(|p| {
            CompiledFilterItem::new(
                entity,
                p.logical,
                ComparisonOperator::Contains,
                Some(TypedValue::Str(term.to_string())),
            )
            .map(CompiledFilter::leaf)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(CompiledFilter::group(LogicalOperator::Or, items)))
}

/// Compile a search request for `entity` within `tenant`
pub fn compile_search(
    tenant: &str,
    entity: EntityType,
    request: &SearchRequest,
    limits: QueryLimits,
) -> Result<CompiledQuery, QueryError> {
    let alias = entity.alias();
    let pagination: Pagination<Value> =
        Pagination::new(request.page.unwrap_or(1).max(1), limits.resolve(request.limit));

    let filter = compile_filter(request.filter.as_ref(), entity)?;
    let search = match &request.search {
        Some(term) => search_filter(entity, term)?,
        None => None,
    };
    let combined = match (filter, search) {
        (Some(f), Some(s)) => Some(CompiledFilter::group(LogicalOperator::And, vec![f, s])),
        (f, s) => f.or(s),
    };
    let fragment = combined
        .map(|f| f.to_cypher(alias, &format!("{}_param_", alias)))
        .unwrap_or_default();
    let order_by = sort_for(entity, &request.sort)?.to_cypher(alias);

    let matched = format!(
        "MATCH (:Tenant {{name:$tenant}})<-[:{}]-({}:{}){}",
        entity.tenant_relationship(),
        alias,
        entity.label(),
        fragment.where_clause()
    );
    let optional = match entity {
        EntityType::Invoice => format!(
            " OPTIONAL MATCH ({}:Contract)-[:HAS_INVOICE]->({})",
            EntityType::Contract.alias(),
            alias
        ),
        _ => String::new(),
    };

    let count_statement = format!("{} RETURN count({})", matched, alias);
    let page_statement = format!(
        "{}{} RETURN {}{} SKIP $skip LIMIT $limit",
        matched, optional, alias, order_by
    );

    let mut params = fragment.params;
    params.insert("tenant".to_string(), Value::String(tenant.to_string()));
    params.insert("skip".to_string(), Value::from(pagination.skip()));
    params.insert("limit".to_string(), Value::from(pagination.limit()));

    tracing::trace!(tenant, entity = %entity, statement = %page_statement, "Compiled search");

    Ok(CompiledQuery {
        count_statement,
        page_statement,
        params,
        page: pagination.page,
        limit: pagination.limit(),
        skip: pagination.skip(),
    })
}

/// Runs compiled searches against the graph store
#[derive(Clone)]
pub struct SearchService {
    reader: Arc<dyn GraphReader>,
    limits: QueryLimits,
}

impl SearchService {
    pub fn new(reader: Arc<dyn GraphReader>, limits: QueryLimits) -> Self {
        Self { reader, limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Count matches, then fetch the requested page.
    ///
    /// The page statement is skipped when the page starts past the last match.
    pub async fn search(
        &self,
        tenant: &str,
        entity: EntityType,
        request: &SearchRequest,
    ) -> Result<Pagination<Value>, SearchError> {
        let query = compile_search(tenant, entity, request, self.limits)?;
        let mut pagination = Pagination::new(query.page, query.limit);

        let count_rows = self
            .reader
            .run(&query.count_statement, &query.params)
            .await?;
        let total = count_rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        pagination.set_total_rows(total);

        if total > pagination.skip() {
            let rows = self
                .reader
                .run(&query.page_statement, &query.params)
                .await?;
            pagination.set_rows(
                rows.into_iter()
                    .filter_map(|row| row.into_iter().next())
                    .collect(),
            );
        }

        tracing::debug!(
            tenant,
            entity = %entity,
            total,
            returned = pagination.rows.len(),
            "Search completed"
        );
        Ok(pagination)
    }
}
