//! Filter tree compilation
//!
//! Validates a client [`Filter`] against entity metadata and compiles it into a
//! [`CompiledFilter`] tree, which renders to a parameterized Cypher fragment.
//! Compilation is pure: no I/O and no shared mutable state.

use serde_json::{Map, Value};

use super::error::QueryError;
use super::metadata::{EntityType, PropertyMetadata};
use super::types::{ComparisonOperator, Filter, FilterNode, FilterShape, TypedValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogicalOperator {
    #[default]
    None,
    And,
    Or,
}

impl LogicalOperator {
    fn joiner(&self) -> &'static str {
        match self {
            Self::Or => " OR ",
            Self::And | Self::None => " AND ",
        }
    }
}

/// Leaf comparison after property resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilterItem {
    /// Physical property name
    pub property: &'static str,
    pub operator: ComparisonOperator,
    /// `None` for operators that take no value (`IS_NULL`, `IS_EMPTY`)
    pub value: Option<TypedValue>,
    /// Caller's flag, passed through as requested
    pub case_sensitive: bool,
    pub include_empty: bool,
    pub metadata: &'static PropertyMetadata,
}

impl CompiledFilterItem {
    /// Build an item directly from a logical property name
    pub fn new(
        entity: EntityType,
        logical: &str,
        operator: ComparisonOperator,
        value: Option<TypedValue>,
    ) -> Result<Self, QueryError> {
        let metadata = entity.resolve(logical)?;
        let item = Self {
            property: metadata.physical,
            operator,
            value,
            case_sensitive: false,
            include_empty: false,
            metadata,
        };
        item.check_value()?;
        Ok(item)
    }

    fn check_value(&self) -> Result<(), QueryError> {
        match (&self.operator, &self.value) {
            (ComparisonOperator::Between, Some(TypedValue::Array(bounds))) if bounds.len() == 2 => {
                Ok(())
            }
            (ComparisonOperator::Between, _) => Err(QueryError::malformed_detail(
                "BETWEEN expects an array of exactly 2 values",
            )),
            (op, None) if op.takes_value() => Err(QueryError::malformed_detail(format!(
                "value required for {:?} on {}",
                op, self.metadata.logical
            ))),
            _ => Ok(()),
        }
    }

    /// Lowering applies to text comparisons the caller asked to run
    /// case-insensitively, on properties that declare support for it.
    fn lowercased(&self) -> bool {
        !self.case_sensitive
            && self.metadata.supports_case_sensitive
            && self.operator.is_text_match()
            && self.value.as_ref().is_some_and(TypedValue::is_text)
    }
}

/// Compiled filter tree; exactly one of `filters` or `details` is populated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub negate: bool,
    pub operator: LogicalOperator,
    pub filters: Vec<CompiledFilter>,
    pub details: Option<CompiledFilterItem>,
}

impl CompiledFilter {
    pub fn leaf(item: CompiledFilterItem) -> Self {
        Self {
            details: Some(item),
            ..Default::default()
        }
    }

    pub fn group(operator: LogicalOperator, filters: Vec<CompiledFilter>) -> Self {
        Self {
            operator,
            filters,
            ..Default::default()
        }
    }

    pub fn negated(inner: CompiledFilter) -> Self {
        Self {
            negate: true,
            filters: vec![inner],
            ..Default::default()
        }
    }

    pub fn shape(&self) -> FilterShape {
        let core = match (&self.details, self.operator) {
            (Some(item), _) => FilterShape::Leaf(item.operator),
            (None, LogicalOperator::Or) => {
                FilterShape::Or(self.filters.iter().map(Self::shape).collect())
            }
            (None, LogicalOperator::None) if self.filters.len() == 1 => self.filters[0].shape(),
            (None, _) => FilterShape::And(self.filters.iter().map(Self::shape).collect()),
        };
        if self.negate {
            FilterShape::Not(Box::new(core))
        } else {
            core
        }
    }

    /// Render as a Cypher boolean expression over `alias`.
    ///
    /// Every leaf gets its own parameter `{param_prefix}{n}`, numbered
    /// depth-first in input order, so the same property can appear in several
    /// branches without collisions.
    pub fn to_cypher(&self, alias: &str, param_prefix: &str) -> FilterFragment {
        let mut builder = FragmentBuilder {
            alias,
            prefix: param_prefix,
            counter: 0,
            params: Map::new(),
        };
        let cypher = builder.render(self);
        FilterFragment {
            cypher,
            params: builder.params,
        }
    }
}

/// Cypher boolean expression plus its parameter bindings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterFragment {
    pub cypher: String,
    pub params: Map<String, Value>,
}

impl FilterFragment {
    pub fn is_empty(&self) -> bool {
        self.cypher.is_empty()
    }

    /// `" WHERE <expr>"`, or empty when there is nothing to filter on
    pub fn where_clause(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.cypher)
        }
    }
}

struct FragmentBuilder<'a> {
    alias: &'a str,
    prefix: &'a str,
    counter: usize,
    params: Map<String, Value>,
}

impl FragmentBuilder<'_> {
    fn render(&mut self, filter: &CompiledFilter) -> String {
        let inner = match &filter.details {
            Some(item) => self.render_item(item),
            None => {
                let mut parts: Vec<String> =
                    filter.filters.iter().map(|f| self.render(f)).collect();
                match parts.len() {
                    0 => "true".to_string(),
                    1 => parts.remove(0),
                    _ => format!("({})", parts.join(filter.operator.joiner())),
                }
            }
        };
        if filter.negate {
            format!("NOT ({})", inner)
        } else {
            inner
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.counter += 1;
        let name = format!("{}{}", self.prefix, self.counter);
        self.params.insert(name.clone(), value);
        name
    }

    fn render_item(&mut self, item: &CompiledFilterItem) -> String {
        let prop = format!("{}.{}", self.alias, item.property);

        let condition = match &item.value {
            None => match item.operator {
                ComparisonOperator::IsEmpty => format!("({prop} IS NULL OR {prop} = '')"),
                _ => format!("{prop} IS NULL"),
            },
            Some(value) => {
                let time = value.is_time();
                match item.operator {
                    ComparisonOperator::In => {
                        let list = match value {
                            TypedValue::Array(_) => value.to_param(),
                            scalar => Value::Array(vec![scalar.to_param()]),
                        };
                        let name = self.bind(list);
                        if time {
                            format!("{prop} IN [v IN ${name} | datetime(v)]")
                        } else {
                            format!("{prop} IN ${name}")
                        }
                    }
                    ComparisonOperator::Between => {
                        let name = self.bind(value.to_param());
                        if time {
                            format!(
                                "({prop} >= datetime(${name}[0]) AND {prop} <= datetime(${name}[1]))"
                            )
                        } else {
                            format!("({prop} >= ${name}[0] AND {prop} <= ${name}[1])")
                        }
                    }
                    op => {
                        let name = self.bind(value.to_param());
                        let (lhs, rhs) = if item.lowercased() {
                            (format!("toLower({prop})"), format!("toLower(${name})"))
                        } else if time {
                            (prop.clone(), format!("datetime(${name})"))
                        } else {
                            (prop.clone(), format!("${name}"))
                        };
                        let cmp = match op {
                            ComparisonOperator::Contains => "CONTAINS",
                            ComparisonOperator::StartsWith => "STARTS WITH",
                            ComparisonOperator::Lte => "<=",
                            ComparisonOperator::Gte => ">=",
                            _ => "=",
                        };
                        format!("{lhs} {cmp} {rhs}")
                    }
                }
            }
        };

        if item.include_empty && item.operator.takes_value() {
            format!("({condition} OR {prop} IS NULL)")
        } else {
            condition
        }
    }
}

/// Compile an optional client filter for `entity`.
///
/// `None` means no filtering and compiles to `Ok(None)`.
pub fn compile_filter(
    filter: Option<&Filter>,
    entity: EntityType,
) -> Result<Option<CompiledFilter>, QueryError> {
    let Some(filter) = filter else {
        return Ok(None);
    };
    let node = FilterNode::parse(filter)?;
    let compiled = compile_node(&node, entity)?;
    tracing::trace!(entity = %entity, shape = ?compiled.shape(), "Compiled filter");
    Ok(Some(compiled))
}

fn compile_node(node: &FilterNode<'_>, entity: EntityType) -> Result<CompiledFilter, QueryError> {
    match node {
        // Negation wraps its child; double negation keeps both wrappers
        FilterNode::Not(inner) => Ok(CompiledFilter::negated(compile_node(inner, entity)?)),
        FilterNode::And(children) => Ok(CompiledFilter::group(
            LogicalOperator::And,
            compile_children(children, entity)?,
        )),
        FilterNode::Or(children) => Ok(CompiledFilter::group(
            LogicalOperator::Or,
            compile_children(children, entity)?,
        )),
        FilterNode::Leaf(item) => {
            let metadata = entity.resolve(&item.property)?;
            let value = if item.operation.takes_value() {
                Some(item.value.real_value()?)
            } else {
                None
            };
            let compiled = CompiledFilterItem {
                property: metadata.physical,
                operator: item.operation,
                value,
                case_sensitive: item.case_sensitive.unwrap_or(false),
                include_empty: item.include_empty.unwrap_or(false),
                metadata,
            };
            compiled.check_value()?;
            Ok(CompiledFilter::leaf(compiled))
        }
    }
}

fn compile_children(
    children: &[FilterNode<'_>],
    entity: EntityType,
) -> Result<Vec<CompiledFilter>, QueryError> {
    children.iter().map(|c| compile_node(c, entity)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::query::types::{AnyTypeValue, FilterItem};

    fn name_contains(value: &str) -> Filter {
        Filter::leaf(
            FilterItem::new("NAME", ComparisonOperator::Contains, value.into())
                .case_sensitive(true),
        )
    }

    fn compile(filter: &Filter) -> Result<CompiledFilter, QueryError> {
        compile_filter(Some(filter), EntityType::Organization).map(|f| f.unwrap())
    }

    #[test]
    fn test_nil_filter_compiles_to_none() {
        assert_eq!(compile_filter(None, EntityType::Organization), Ok(None));
    }

    #[test]
    fn test_multiple_variants_rejected() {
        let filter = Filter {
            not: Some(Box::default()),
            and: Some(vec![Filter::default()]),
            ..Default::default()
        };
        let err = compile(&filter).unwrap_err();
        assert_eq!(err.to_string(), "incorrect filter formatting");
    }

    #[test]
    fn test_and_group_needs_two_children() {
        let err = compile(&Filter::and(vec![Filter::default()])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "incorrect filter formatting: at least 2 filters expected in AND group"
        );

        let err = compile(&Filter::and(vec![])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "incorrect filter formatting: at least 2 filters expected in AND group"
        );
    }

    #[test]
    fn test_or_group_needs_two_children() {
        let err = compile(&Filter::or(vec![name_contains("a")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "incorrect filter formatting: at least 2 filters expected in OR group"
        );
    }

    #[test]
    fn test_double_negation_keeps_structure() {
        let filter = Filter::not(Filter::not(name_contains("testValue")));
        let compiled = compile(&filter).unwrap();

        assert!(compiled.negate);
        assert_eq!(compiled.filters.len(), 1);
        assert!(compiled.details.is_none());

        let child = &compiled.filters[0];
        assert!(child.negate);
        assert_eq!(child.filters.len(), 1);

        let grandchild = &child.filters[0];
        assert!(!grandchild.negate);
        let item = grandchild.details.as_ref().unwrap();
        assert_eq!(item.property, "name");
        assert_eq!(item.operator, ComparisonOperator::Contains);
        assert_eq!(item.value, Some(TypedValue::Str("testValue".to_string())));
        assert!(item.case_sensitive);
    }

    #[test]
    fn test_negated_group_preserves_operator() {
        let filter = Filter::not(Filter::or(vec![
            name_contains("a"),
            name_contains("b"),
            name_contains("c"),
        ]));
        let compiled = compile(&filter).unwrap();

        assert!(compiled.negate);
        let group = &compiled.filters[0];
        assert!(!group.negate);
        assert_eq!(group.operator, LogicalOperator::Or);
        assert_eq!(group.filters.len(), 3);
    }

    #[test]
    fn test_nested_groups_preserve_order() {
        let a = name_contains("A");
        let b = Filter::leaf(FilterItem::new(
            "WEBSITE",
            ComparisonOperator::Equals,
            "b.com".into(),
        ));
        let filter = Filter::and(vec![Filter::or(vec![a.clone(), a]), b]);
        let compiled = compile(&filter).unwrap();

        assert_eq!(compiled.operator, LogicalOperator::And);
        assert_eq!(compiled.filters.len(), 2);

        let or_group = &compiled.filters[0];
        assert_eq!(or_group.operator, LogicalOperator::Or);
        assert_eq!(or_group.filters.len(), 2);
        for leaf in &or_group.filters {
            let item = leaf.details.as_ref().unwrap();
            assert_eq!(item.operator, ComparisonOperator::Contains);
            assert_eq!(item.value, Some(TypedValue::Str("A".to_string())));
        }

        let item = compiled.filters[1].details.as_ref().unwrap();
        assert_eq!(item.property, "website");
        assert_eq!(item.operator, ComparisonOperator::Equals);
        assert_eq!(item.value, Some(TypedValue::Str("b.com".to_string())));
    }

    #[test]
    fn test_shape_round_trip() {
        let filter = Filter::and(vec![
            Filter::not(Filter::not(name_contains("x"))),
            Filter::or(vec![
                name_contains("y"),
                Filter::not(Filter::and(vec![name_contains("z"), name_contains("w")])),
            ]),
        ]);
        let compiled = compile(&filter).unwrap();
        let original = FilterNode::parse(&filter).unwrap().shape();
        assert_eq!(compiled.shape(), original);
    }

    #[test]
    fn test_unknown_property() {
        let filter = Filter::leaf(FilterItem::new(
            "FAVOURITE_COLOUR",
            ComparisonOperator::Equals,
            "red".into(),
        ));
        let err = compile(&filter).unwrap_err();
        assert!(matches!(err, QueryError::UnknownProperty { .. }));
    }

    #[test]
    fn test_case_sensitive_flag_passes_through() {
        // DUE_DATE does not support case-insensitive matching; the flag is kept as sent
        let filter = Filter::leaf(FilterItem::new(
            "DUE_DATE",
            ComparisonOperator::Equals,
            "2024-01-01".into(),
        ));
        let compiled = compile_filter(Some(&filter), EntityType::Invoice)
            .unwrap()
            .unwrap();
        let item = compiled.details.unwrap();
        assert!(!item.case_sensitive);
        assert!(!item.metadata.supports_case_sensitive);
    }

    #[test]
    fn test_fragment_with_unique_params() {
        let ci = Filter::leaf(FilterItem::new(
            "NAME",
            ComparisonOperator::Contains,
            "acme".into(),
        ));
        let website = Filter::leaf(
            FilterItem::new("WEBSITE", ComparisonOperator::Equals, "acme.com".into())
                .case_sensitive(true),
        );
        let filter = Filter::and(vec![Filter::or(vec![ci.clone(), ci]), website]);
        let fragment = compile(&filter).unwrap().to_cypher("org", "org_param_");

        assert_eq!(
            fragment.cypher,
            "((toLower(org.name) CONTAINS toLower($org_param_1) OR \
             toLower(org.name) CONTAINS toLower($org_param_2)) AND org.website = $org_param_3)"
        );
        let keys: Vec<&str> = fragment.params.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["org_param_1", "org_param_2", "org_param_3"]);
        assert_eq!(fragment.params["org_param_3"], serde_json::json!("acme.com"));
        assert_eq!(
            fragment.where_clause(),
            format!(" WHERE {}", fragment.cypher)
        );
    }

    #[test]
    fn test_fragment_negation() {
        let filter = Filter::not(Filter::not(name_contains("x")));
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(fragment.cypher, "NOT (NOT (org.name CONTAINS $p1))");
    }

    #[test]
    fn test_fragment_in_wraps_scalar() {
        let filter = Filter::leaf(FilterItem::new(
            "INDUSTRY",
            ComparisonOperator::In,
            "saas".into(),
        ));
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(fragment.cypher, "org.industry IN $p1");
        assert_eq!(fragment.params["p1"], serde_json::json!(["saas"]));
    }

    #[test]
    fn test_fragment_between_numbers() {
        let filter = Filter::leaf(FilterItem::new(
            "EMPLOYEES",
            ComparisonOperator::Between,
            AnyTypeValue::array(vec![AnyTypeValue::int(10), AnyTypeValue::int(50)]),
        ));
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(
            fragment.cypher,
            "(org.employees >= $p1[0] AND org.employees <= $p1[1])"
        );
        assert_eq!(fragment.params["p1"], serde_json::json!([10, 50]));
    }

    #[test]
    fn test_between_requires_two_values() {
        let filter = Filter::leaf(FilterItem::new(
            "EMPLOYEES",
            ComparisonOperator::Between,
            AnyTypeValue::int(10),
        ));
        assert!(matches!(compile(&filter), Err(QueryError::Malformed(_))));
    }

    #[test]
    fn test_fragment_time_comparison() {
        let t: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let filter = Filter::leaf(FilterItem::new(
            "CREATED_AT",
            ComparisonOperator::Gte,
            AnyTypeValue::time(t),
        ));
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(fragment.cypher, "org.createdAt >= datetime($p1)");
    }

    #[test]
    fn test_fragment_null_checks_and_include_empty() {
        let mut industry = FilterItem::new("INDUSTRY", ComparisonOperator::Equals, "saas".into())
            .case_sensitive(true);
        industry.include_empty = Some(true);
        let filter = Filter::and(vec![
            Filter::leaf(FilterItem::new(
                "MARKET",
                ComparisonOperator::IsEmpty,
                AnyTypeValue::default(),
            )),
            Filter::leaf(industry),
        ]);
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(
            fragment.cypher,
            "((org.market IS NULL OR org.market = '') AND (org.industry = $p1 OR org.industry IS NULL))"
        );
        assert_eq!(fragment.params.len(), 1);
    }

    #[test]
    fn test_non_text_value_is_not_lowercased() {
        let filter = Filter::leaf(FilterItem::new(
            "IS_CUSTOMER",
            ComparisonOperator::Equals,
            AnyTypeValue::boolean(true),
        ));
        let fragment = compile(&filter).unwrap().to_cypher("org", "p");
        assert_eq!(fragment.cypher, "org.isCustomer = $p1");
    }

    #[test]
    fn test_empty_group_renders_true() {
        let filter = CompiledFilter::group(LogicalOperator::And, vec![]);
        assert_eq!(filter.to_cypher("org", "p").cypher, "true");
    }
}
