//! Filter and sort DSL types
//!
//! These mirror the GraphQL input types (`Filter`, `FilterItem`, `AnyTypeValue`,
//! `SortBy`) and are deserialized straight from request JSON. Validation into
//! the strict [`FilterNode`] tree happens in [`FilterNode::parse`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::QueryError;

/// Nested boolean filter as sent by clients.
///
/// Exactly one of the four members must be set on every node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Filter {
    #[serde(rename = "NOT", alias = "not", default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Filter>>,
    #[serde(rename = "AND", alias = "and", default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<Filter>>,
    #[serde(rename = "OR", alias = "or", default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<Filter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterItem>,
}

impl Filter {
    pub fn leaf(item: FilterItem) -> Self {
        Self {
            filter: Some(item),
            ..Default::default()
        }
    }

    pub fn not(inner: Filter) -> Self {
        Self {
            not: Some(Box::new(inner)),
            ..Default::default()
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self {
            and: Some(filters),
            ..Default::default()
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self {
            or: Some(filters),
            ..Default::default()
        }
    }
}

/// Single property comparison
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub property: String,
    #[serde(default)]
    pub operation: ComparisonOperator,
    #[serde(default)]
    pub value: AnyTypeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    /// Also match nodes where the property is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_empty: Option<bool>,
}

impl FilterItem {
    pub fn new(
        property: impl Into<String>,
        operation: ComparisonOperator,
        value: AnyTypeValue,
    ) -> Self {
        Self {
            property: property.into(),
            operation,
            value,
            case_sensitive: None,
            include_empty: None,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    #[default]
    #[serde(alias = "EQ")]
    Equals,
    Contains,
    StartsWith,
    In,
    Lte,
    Gte,
    Between,
    IsNull,
    IsEmpty,
}

impl ComparisonOperator {
    /// Operators that compare against a value (all but the null checks)
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsEmpty)
    }

    /// Operators that honour case-insensitive matching on text properties
    pub fn is_text_match(&self) -> bool {
        matches!(self, Self::Equals | Self::Contains | Self::StartsWith)
    }
}

/// Value holder with one optional member per supported type
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnyTypeValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub str: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array: Option<Vec<AnyTypeValue>>,
}

impl AnyTypeValue {
    pub fn string(s: impl Into<String>) -> Self {
        Self {
            str: Some(s.into()),
            ..Default::default()
        }
    }

    pub fn int(i: i64) -> Self {
        Self {
            int: Some(i),
            ..Default::default()
        }
    }

    pub fn float(f: f64) -> Self {
        Self {
            float: Some(f),
            ..Default::default()
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self {
            bool: Some(b),
            ..Default::default()
        }
    }

    pub fn time(t: DateTime<Utc>) -> Self {
        Self {
            time: Some(t),
            ..Default::default()
        }
    }

    pub fn array(values: Vec<AnyTypeValue>) -> Self {
        Self {
            array: Some(values),
            ..Default::default()
        }
    }

    /// Extract the single populated member
    pub fn real_value(&self) -> Result<TypedValue, QueryError> {
        let populated = [
            self.str.is_some(),
            self.int.is_some(),
            self.float.is_some(),
            self.bool.is_some(),
            self.time.is_some(),
            self.array.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated != 1 {
            return Err(QueryError::malformed_detail(
                "value must hold exactly one of str, int, float, bool, time, array",
            ));
        }

        if let Some(s) = &self.str {
            Ok(TypedValue::Str(s.clone()))
        } else if let Some(i) = self.int {
            Ok(TypedValue::Int(i))
        } else if let Some(f) = self.float {
            Ok(TypedValue::Float(f))
        } else if let Some(b) = self.bool {
            Ok(TypedValue::Bool(b))
        } else if let Some(t) = self.time {
            Ok(TypedValue::Time(t))
        } else {
            let values = self
                .array
                .iter()
                .flatten()
                .map(AnyTypeValue::real_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypedValue::Array(values))
        }
    }
}

impl From<&str> for AnyTypeValue {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

/// Concrete filter value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Array(Vec<TypedValue>),
}

impl TypedValue {
    /// Render as a query parameter value
    pub fn to_param(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Time(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Array(values) => {
                serde_json::Value::Array(values.iter().map(TypedValue::to_param).collect())
            }
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    /// Timestamps (or non-empty lists of them) need `datetime()` conversion in Cypher
    pub fn is_time(&self) -> bool {
        match self {
            Self::Time(_) => true,
            Self::Array(values) => {
                !values.is_empty() && values.iter().all(|v| matches!(v, Self::Time(_)))
            }
            _ => false,
        }
    }
}

/// Validated filter tree: exactly one variant per node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode<'a> {
    Not(Box<FilterNode<'a>>),
    And(Vec<FilterNode<'a>>),
    Or(Vec<FilterNode<'a>>),
    Leaf(&'a FilterItem),
}

/// Minimum number of children in an AND/OR group
pub const MIN_GROUP_SIZE: usize = 2;

impl<'a> FilterNode<'a> {
    /// Validate a client filter into a strict tree.
    ///
    /// Group sizes are checked before children are visited, so a group with a
    /// single empty child reports the group error rather than the child's.
    pub fn parse(filter: &'a Filter) -> Result<Self, QueryError> {
        let set = [
            filter.not.is_some(),
            filter.and.is_some(),
            filter.or.is_some(),
            filter.filter.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count();
        if set != 1 {
            return Err(QueryError::malformed());
        }

        if let Some(inner) = &filter.not {
            return Ok(Self::Not(Box::new(Self::parse(inner)?)));
        }
        if let Some(children) = &filter.and {
            return Ok(Self::And(Self::parse_group(children, "AND")?));
        }
        if let Some(children) = &filter.or {
            return Ok(Self::Or(Self::parse_group(children, "OR")?));
        }
        match &filter.filter {
            Some(item) => Ok(Self::Leaf(item)),
            None => Err(QueryError::malformed()),
        }
    }

    fn parse_group(children: &'a [Filter], name: &str) -> Result<Vec<Self>, QueryError> {
        if children.len() < MIN_GROUP_SIZE {
            return Err(QueryError::malformed_detail(format!(
                "at least {} filters expected in {} group",
                MIN_GROUP_SIZE, name
            )));
        }
        children.iter().map(Self::parse).collect()
    }

    pub fn shape(&self) -> FilterShape {
        match self {
            Self::Not(inner) => FilterShape::Not(Box::new(inner.shape())),
            Self::And(children) => FilterShape::And(children.iter().map(Self::shape).collect()),
            Self::Or(children) => FilterShape::Or(children.iter().map(Self::shape).collect()),
            Self::Leaf(item) => FilterShape::Leaf(item.operation),
        }
    }
}

/// Structure of a filter tree, ignoring property names and values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterShape {
    Not(Box<FilterShape>),
    And(Vec<FilterShape>),
    Or(Vec<FilterShape>),
    Leaf(ComparisonOperator),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_cypher(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ordering directive; the first rule in a list is the primary key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBy {
    pub by: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

impl SortBy {
    pub fn new(by: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            by: by.into(),
            direction,
            case_sensitive: None,
        }
    }
}
