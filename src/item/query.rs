//! Query descriptors shared by linked item queries, the cache and the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a query addresses its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryMethod {
    /// Fetch one item by its (possibly composite) unique key
    Get,
    /// Enumerate every item in a scope
    List,
    /// Find items by a free-form or parent key
    Search,
}

impl QueryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::List => "LIST",
            Self::Search => "SEARCH",
        }
    }

    /// Only GET and SEARCH may appear in a linked item query.
    pub fn is_linkable(&self) -> bool {
        matches!(self, Self::Get | Self::Search)
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query against the adapter registered for `item_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "type")]
    pub item_type: String,
    pub method: QueryMethod,
    pub query: String,
    pub scope: String,
}

impl Query {
    pub fn new(
        item_type: impl Into<String>,
        method: QueryMethod,
        query: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            method,
            query: query.into(),
            scope: scope.into(),
        }
    }

    pub fn get(item_type: impl Into<String>, query: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::new(item_type, QueryMethod::Get, query, scope)
    }

    pub fn search(
        item_type: impl Into<String>,
        query: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::new(item_type, QueryMethod::Search, query, scope)
    }

    pub fn list(item_type: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::new(item_type, QueryMethod::List, "", scope)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}' in {}",
            self.method, self.item_type, self.query, self.scope
        )
    }
}

/// Directional flags on a link between two items.
///
/// `inbound` means a change to the linked item can affect this item;
/// `outbound` means a change to this item can affect the linked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlastPropagation {
    #[serde(rename = "in")]
    pub inbound: bool,
    #[serde(rename = "out")]
    pub outbound: bool,
}

impl BlastPropagation {
    /// Informational link only
    pub const NONE: Self = Self::new(false, false);
    /// This item relies on the linked item
    pub const INBOUND: Self = Self::new(true, false);
    /// The linked item relies on this item
    pub const OUTBOUND: Self = Self::new(false, true);
    /// Tightly coupled: changes cross the link both ways
    pub const BOTH: Self = Self::new(true, true);

    pub const fn new(inbound: bool, outbound: bool) -> Self {
        Self { inbound, outbound }
    }

    pub fn is_none(&self) -> bool {
        !self.inbound && !self.outbound
    }
}
