//! Scope strings
//!
//! A scope bounds where a query applies. Global GCP kinds live in a
//! project scope (`my-project`); zonal kinds add the zone
//! (`my-project.us-central1-a`).

/// Matches every scope an adapter serves (list and search only).
pub const WILDCARD: &str = "*";

/// Scope used for links to resources outside any project (DNS names, IPs).
pub const GLOBAL: &str = "global";

/// Project-level scope.
pub fn project(project_id: &str) -> String {
    project_id.to_string()
}

/// Zone-level scope.
pub fn zonal(project_id: &str, zone: &str) -> String {
    format!("{project_id}.{zone}")
}

/// Split a scope into its project and optional location.
///
/// Domain-scoped project ids (`example.com:my-project`) contain a dot of
/// their own, so only a dot after the `:` separates the location.
pub fn split(scope: &str) -> (&str, Option<&str>) {
    let search_from = scope.find(':').map_or(0, |i| i + 1);
    match scope[search_from..].find('.') {
        Some(offset) => {
            let dot = search_from + offset;
            (&scope[..dot], Some(&scope[dot + 1..]))
        }
        None => (scope, None),
    }
}

pub fn is_wildcard(scope: &str) -> bool {
    scope == WILDCARD
}
