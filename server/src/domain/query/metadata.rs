//! Property metadata for filterable and sortable entities
//!
//! Maps client-facing logical field names (e.g. `NAME`) to graph-store
//! property names (e.g. `name`). Tables are static and read-only, so
//! lookups are safe from any thread without locking.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::QueryError;

/// Resolved metadata for one logical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub logical: &'static str,
    pub physical: &'static str,
    /// Whether the property holds text that may be compared case-insensitively
    pub supports_case_sensitive: bool,
}

const fn text(logical: &'static str, physical: &'static str) -> PropertyMetadata {
    PropertyMetadata {
        logical,
        physical,
        supports_case_sensitive: true,
    }
}

const fn plain(logical: &'static str, physical: &'static str) -> PropertyMetadata {
    PropertyMetadata {
        logical,
        physical,
        supports_case_sensitive: false,
    }
}

const ORGANIZATION: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("NAME", "name"),
    text("DESCRIPTION", "description"),
    text("WEBSITE", "website"),
    text("INDUSTRY", "industry"),
    text("MARKET", "market"),
    text("REFERENCE_ID", "referenceId"),
    plain("EMPLOYEES", "employees"),
    plain("IS_CUSTOMER", "isCustomer"),
    plain("HIDE", "hide"),
    plain("LAST_TOUCHPOINT_AT", "lastTouchpointAt"),
    plain("CREATED_AT", "createdAt"),
    plain("UPDATED_AT", "updatedAt"),
];

const CONTACT: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("NAME", "name"),
    text("FIRST_NAME", "firstName"),
    text("LAST_NAME", "lastName"),
    text("PREFIX", "prefix"),
    text("DESCRIPTION", "description"),
    text("TIMEZONE", "timezone"),
    plain("CREATED_AT", "createdAt"),
    plain("UPDATED_AT", "updatedAt"),
];

const USER: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("FIRST_NAME", "firstName"),
    text("LAST_NAME", "lastName"),
    plain("INTERNAL", "internal"),
    plain("BOT", "bot"),
    plain("CREATED_AT", "createdAt"),
];

const MEETING: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("NAME", "name"),
    text("AGENDA", "agenda"),
    plain("START_AT", "startedAt"),
    plain("END_AT", "endedAt"),
    plain("CREATED_AT", "createdAt"),
];

const CONTRACT: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("NAME", "name"),
    plain("STATUS", "status"),
    plain("SERVICE_STARTED_AT", "serviceStartedAt"),
    plain("ENDED_AT", "endedAt"),
    plain("CREATED_AT", "createdAt"),
];

const INVOICE: &[PropertyMetadata] = &[
    plain("ID", "id"),
    text("NUMBER", "number"),
    plain("STATUS", "status"),
    plain("DRY_RUN", "dryRun"),
    plain("AMOUNT", "totalAmount"),
    plain("CURRENCY", "currency"),
    plain("ISSUED_DATE", "issuedDate"),
    plain("DUE_DATE", "dueDate"),
    plain("CREATED_AT", "createdAt"),
];

/// Entity types whose nodes can be filtered, sorted and awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Organization,
    Contact,
    User,
    Meeting,
    Contract,
    Invoice,
}

impl EntityType {
    pub const ALL: &'static [EntityType] = &[
        Self::Organization,
        Self::Contact,
        Self::User,
        Self::Meeting,
        Self::Contract,
        Self::Invoice,
    ];

    fn properties(&self) -> &'static [PropertyMetadata] {
        match self {
            Self::Organization => ORGANIZATION,
            Self::Contact => CONTACT,
            Self::User => USER,
            Self::Meeting => MEETING,
            Self::Contract => CONTRACT,
            Self::Invoice => INVOICE,
        }
    }

    /// Resolve a logical field name (case-sensitive) to its metadata
    pub fn resolve(&self, logical: &str) -> Result<&'static PropertyMetadata, QueryError> {
        self.properties()
            .iter()
            .find(|p| p.logical == logical)
            .ok_or_else(|| QueryError::unknown_property(self.label(), logical))
    }

    /// Text properties matched by free-text search
    pub fn searchable(&self) -> impl Iterator<Item = &'static PropertyMetadata> {
        self.properties()
            .iter()
            .filter(|p| p.supports_case_sensitive)
    }

    /// Graph node label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Organization => "Organization",
            Self::Contact => "Contact",
            Self::User => "User",
            Self::Meeting => "Meeting",
            Self::Contract => "Contract",
            Self::Invoice => "Invoice",
        }
    }

    /// Node alias used in generated Cypher
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Organization => "org",
            Self::Contact => "c",
            Self::User => "u",
            Self::Meeting => "m",
            Self::Contract => "ct",
            Self::Invoice => "i",
        }
    }

    /// Relationship linking the node to its tenant
    pub fn tenant_relationship(&self) -> &'static str {
        match self {
            Self::Organization => "ORGANIZATION_BELONGS_TO_TENANT",
            Self::Contact => "CONTACT_BELONGS_TO_TENANT",
            Self::User => "USER_BELONGS_TO_TENANT",
            Self::Meeting => "MEETING_BELONGS_TO_TENANT",
            Self::Contract => "CONTRACT_BELONGS_TO_TENANT",
            Self::Invoice => "INVOICE_BELONGS_TO_TENANT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Contact => "contact",
            Self::User => "user",
            Self::Meeting => "meeting",
            Self::Contract => "contract",
            Self::Invoice => "invoice",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|e| e.as_str()).collect();
                format!("unknown entity '{}', expected one of: {}", s, names.join(", "))
            })
    }
}
