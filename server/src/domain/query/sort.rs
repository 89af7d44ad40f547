//! Sort rule compilation
//!
//! Compiles ordered [`SortBy`] directives into a Cypher `ORDER BY` fragment.
//! `rules[0]` is the primary sort key.

use std::collections::HashMap;

use super::error::QueryError;
use super::metadata::{EntityType, PropertyMetadata};
use super::types::{SortBy, SortDirection};

/// One compiled ordering key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Node alias; `None` uses the alias passed at render time
    pub alias: Option<String>,
    pub property: &'static PropertyMetadata,
    pub direction: SortDirection,
    pub lowercase: bool,
    /// Expression substituted for null values
    pub null_default: Option<String>,
}

impl SortKey {
    fn expression(&self, alias: &str) -> String {
        let alias = self.alias.as_deref().unwrap_or(alias);
        let mut expr = format!("{}.{}", alias, self.property.physical);
        if self.lowercase {
            expr = format!("toLower({})", expr);
        }
        if let Some(default) = &self.null_default {
            expr = format!("coalesce({}, {})", expr, default);
        }
        format!("{} {}", expr, self.direction.as_cypher())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSort {
    pub keys: Vec<SortKey>,
}

impl CompiledSort {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `" ORDER BY k1 ASC, k2 DESC"`, or empty when there are no keys
    pub fn to_cypher(&self, alias: &str) -> String {
        if self.keys.is_empty() {
            return String::new();
        }
        let keys: Vec<String> = self.keys.iter().map(|k| k.expression(alias)).collect();
        format!(" ORDER BY {}", keys.join(", "))
    }
}

fn compile_rule(
    rule: &SortBy,
    logical: &str,
    entity: EntityType,
) -> Result<SortKey, QueryError> {
    let property = entity.resolve(logical)?;
    let lowercase = !rule.case_sensitive.unwrap_or(false) && property.supports_case_sensitive;
    Ok(SortKey {
        alias: None,
        property,
        direction: rule.direction,
        lowercase,
        null_default: None,
    })
}

/// Compile sort rules against a single entity
pub fn compile_sort(rules: &[SortBy], entity: EntityType) -> Result<CompiledSort, QueryError> {
    let keys = rules
        .iter()
        .map(|rule| compile_rule(rule, &rule.by, entity))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::trace!(entity = %entity, keys = keys.len(), "Compiled sort");
    Ok(CompiledSort { keys })
}

/// Null replacement for one property, per direction
#[derive(Debug, Clone)]
pub struct SortDefault {
    pub property: String,
    pub asc_default: String,
    pub desc_default: String,
}

impl SortDefault {
    pub fn new(
        property: impl Into<String>,
        asc_default: impl Into<String>,
        desc_default: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            asc_default: asc_default.into(),
            desc_default: desc_default.into(),
        }
    }
}

/// Entity participating in a multi-entity sort
#[derive(Debug, Clone)]
pub struct SortEntity {
    /// Prefix of the sort key, e.g. `CONTRACT` for `CONTRACT_ENDED_AT`
    pub prefix: String,
    pub alias: String,
    pub entity: EntityType,
    pub defaults: Vec<SortDefault>,
}

impl SortEntity {
    pub fn new(prefix: impl Into<String>, alias: impl Into<String>, entity: EntityType) -> Self {
        Self {
            prefix: prefix.into(),
            alias: alias.into(),
            entity,
            defaults: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: SortDefault) -> Self {
        self.defaults.push(default);
        self
    }
}

/// Sort across several aliased entities, with per-field null defaults
#[derive(Debug, Clone)]
pub struct MultiEntitySort {
    entities: Vec<SortEntity>,
    /// (alias, logical name) -> (asc default, desc default)
    defaults: HashMap<(String, String), (String, String)>,
}

impl MultiEntitySort {
    pub fn new(entities: Vec<SortEntity>) -> Self {
        let defaults = entities
            .iter()
            .flat_map(|e| {
                e.defaults.iter().map(|d| {
                    (
                        (e.alias.clone(), d.property.clone()),
                        (d.asc_default.clone(), d.desc_default.clone()),
                    )
                })
            })
            .collect();
        Self { entities, defaults }
    }

    /// Find the entity whose prefix matches `by`, preferring the longest prefix
    fn split<'a>(&self, by: &'a str) -> Option<(&SortEntity, &'a str)> {
        self.entities
            .iter()
            .filter_map(|e| {
                by.strip_prefix(e.prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|logical| (e, logical))
            })
            .max_by_key(|(e, _)| e.prefix.len())
    }

    pub fn compile(&self, rules: &[SortBy]) -> Result<CompiledSort, QueryError> {
        let mut keys = Vec::with_capacity(rules.len());
        for rule in rules {
            let (target, logical) = self
                .split(&rule.by)
                .ok_or_else(|| QueryError::unknown_property("sort", rule.by.as_str()))?;
            let mut key = compile_rule(rule, logical, target.entity)?;
            key.alias = Some(target.alias.clone());
            key.null_default = self
                .defaults
                .get(&(target.alias.clone(), logical.to_string()))
                .map(|(asc, desc)| match rule.direction {
                    SortDirection::Asc => asc.clone(),
                    SortDirection::Desc => desc.clone(),
                });
            keys.push(key);
        }
        Ok(CompiledSort { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_sort() -> MultiEntitySort {
        MultiEntitySort::new(vec![
            SortEntity::new("CONTRACT", "ct", EntityType::Contract).with_default(
                SortDefault::new("ENDED_AT", "date('2100-01-01')", "date('1900-01-01')"),
            ),
            SortEntity::new("INVOICE", "i", EntityType::Invoice),
        ])
    }

    #[test]
    fn test_empty_rules() {
        let sort = compile_sort(&[], EntityType::Organization).unwrap();
        assert!(sort.is_empty());
        assert_eq!(sort.to_cypher("org"), "");
    }

    #[test]
    fn test_rules_keep_precedence() {
        let rules = vec![
            SortBy::new("CREATED_AT", SortDirection::Desc),
            SortBy::new("NAME", SortDirection::Asc),
        ];
        let sort = compile_sort(&rules, EntityType::Organization).unwrap();
        assert_eq!(
            sort.to_cypher("org"),
            " ORDER BY org.createdAt DESC, toLower(org.name) ASC"
        );
    }

    #[test]
    fn test_case_sensitive_rule_is_not_lowered() {
        let mut rule = SortBy::new("NAME", SortDirection::Asc);
        rule.case_sensitive = Some(true);
        let sort = compile_sort(&[rule], EntityType::Contact).unwrap();
        assert_eq!(sort.to_cypher("c"), " ORDER BY c.name ASC");
    }

    #[test]
    fn test_unknown_sort_property() {
        let rules = vec![SortBy::new("SHOE_SIZE", SortDirection::Asc)];
        assert!(matches!(
            compile_sort(&rules, EntityType::User),
            Err(QueryError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_multi_entity_defaults_follow_direction() {
        let sort = invoice_sort();

        let asc = sort
            .compile(&[SortBy::new("CONTRACT_ENDED_AT", SortDirection::Asc)])
            .unwrap();
        assert_eq!(
            asc.to_cypher(""),
            " ORDER BY coalesce(ct.endedAt, date('2100-01-01')) ASC"
        );

        let desc = sort
            .compile(&[SortBy::new("CONTRACT_ENDED_AT", SortDirection::Desc)])
            .unwrap();
        assert_eq!(
            desc.to_cypher(""),
            " ORDER BY coalesce(ct.endedAt, date('1900-01-01')) DESC"
        );
    }

    #[test]
    fn test_multi_entity_without_default_passes_through() {
        let sort = invoice_sort()
            .compile(&[
                SortBy::new("INVOICE_DUE_DATE", SortDirection::Desc),
                SortBy::new("CONTRACT_NAME", SortDirection::Asc),
            ])
            .unwrap();
        assert_eq!(
            sort.to_cypher(""),
            " ORDER BY i.dueDate DESC, toLower(ct.name) ASC"
        );
    }

    #[test]
    fn test_multi_entity_unknown_prefix() {
        let err = invoice_sort()
            .compile(&[SortBy::new("ORGANIZATION_NAME", SortDirection::Asc)])
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::unknown_property("sort", "ORGANIZATION_NAME")
        );
    }

    #[test]
    fn test_multi_entity_prefers_longest_prefix() {
        let sort = MultiEntitySort::new(vec![
            SortEntity::new("CONTRACT", "ct", EntityType::Contract),
            SortEntity::new("CONTRACT_INVOICE", "i", EntityType::Invoice),
        ]);
        let compiled = sort
            .compile(&[SortBy::new("CONTRACT_INVOICE_DUE_DATE", SortDirection::Asc)])
            .unwrap();
        assert_eq!(compiled.to_cypher(""), " ORDER BY i.dueDate ASC");
    }
}
