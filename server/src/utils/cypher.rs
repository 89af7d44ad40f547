//! Cypher utility functions

/// Quote a label or relationship type as a Cypher identifier.
///
/// Backticks inside the name are doubled, so user-influenced names (such as
/// tenant-suffixed labels) cannot break out of the identifier.
///
/// # Example
///
/// ```
/// use crmgraph_server::utils::cypher::quote_identifier;
///
/// assert_eq!(quote_identifier("Organization_acme"), "`Organization_acme`");
/// assert_eq!(quote_identifier("a`b"), "`a``b`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Tenant-scoped node label, e.g. `Organization_acme`
pub fn tenant_label(label: &str, tenant: &str) -> String {
    format!("{}_{}", label, tenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!(quote_identifier("Contact"), "`Contact`");
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("x` DETACH DELETE n //"), "`x`` DETACH DELETE n //`");
    }

    #[test]
    fn test_tenant_label() {
        assert_eq!(tenant_label("Invoice", "openline"), "Invoice_openline");
    }
}
