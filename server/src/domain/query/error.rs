//! Query compilation errors

use thiserror::Error;

/// Message used for every structural violation of the filter tree
pub const MALFORMED_FILTER: &str = "incorrect filter formatting";

/// Errors raised while compiling filters and sort rules.
///
/// Both variants are deterministic and caused by the request itself,
/// so they are surfaced to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Structural violation in the filter tree
    #[error("{0}")]
    Malformed(String),

    /// Logical field name not present in the entity metadata
    #[error("unknown property {property} for {entity}")]
    UnknownProperty {
        entity: &'static str,
        property: String,
    },
}

impl QueryError {
    pub fn malformed() -> Self {
        Self::Malformed(MALFORMED_FILTER.to_string())
    }

    pub fn malformed_detail(detail: impl std::fmt::Display) -> Self {
        Self::Malformed(format!("{}: {}", MALFORMED_FILTER, detail))
    }

    pub fn unknown_property(entity: &'static str, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            entity,
            property: property.into(),
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "MALFORMED_FILTER",
            Self::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        assert_eq!(
            QueryError::malformed().to_string(),
            "incorrect filter formatting"
        );
        assert_eq!(
            QueryError::malformed_detail("at least 2 filters expected in AND group").to_string(),
            "incorrect filter formatting: at least 2 filters expected in AND group"
        );
    }

    #[test]
    fn test_unknown_property_is_distinct() {
        let err = QueryError::unknown_property("Organization", "NAMEX");
        assert_eq!(err.to_string(), "unknown property NAMEX for Organization");
        assert_eq!(err.code(), "UNKNOWN_PROPERTY");
        assert_eq!(QueryError::malformed().code(), "MALFORMED_FILTER");
    }
}
