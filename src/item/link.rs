//! Linked item queries: the graph edges an item carries.
//!
//! Two shapes cover nearly every resource relationship:
//!
//! - **external dependency**: this item uses something it does not own
//!   (an image built from a disk). Addressed with GET, blast flows in.
//! - **owned child**: this item is a parent whose children are found by a
//!   SEARCH on the parent's key (an instance and its databases). Blast
//!   flows in, and also out when the child can break the parent
//!   (certificates, firewall rules, configuration).

use serde::{Deserialize, Serialize};

use super::query::{BlastPropagation, Query, QueryMethod};

/// How tightly an owned child is coupled to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    /// The child depends on the parent but cannot affect it (a database)
    Dependent,
    /// The child can itself break the parent (certificates, firewall rules)
    Tight,
}

impl Coupling {
    fn blast_propagation(self) -> BlastPropagation {
        match self {
            Self::Dependent => BlastPropagation::INBOUND,
            Self::Tight => BlastPropagation::BOTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedItemQuery {
    pub query: Query,
    pub blast_propagation: BlastPropagation,
}

impl LinkedItemQuery {
    pub fn new(query: Query, blast_propagation: BlastPropagation) -> Self {
        Self {
            query,
            blast_propagation,
        }
    }

    /// A resource this item uses but does not own.
    pub fn dependency(
        item_type: impl Into<String>,
        key: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::new(Query::get(item_type, key, scope), BlastPropagation::INBOUND)
    }

    /// A resource that uses this item (e.g. the instances a disk is attached to).
    pub fn dependent(
        item_type: impl Into<String>,
        key: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::new(Query::get(item_type, key, scope), BlastPropagation::OUTBOUND)
    }

    /// Children enumerated by searching on this item's own key.
    pub fn child(
        item_type: impl Into<String>,
        parent_key: impl Into<String>,
        scope: impl Into<String>,
        coupling: Coupling,
    ) -> Self {
        Self::new(
            Query::search(item_type, parent_key, scope),
            coupling.blast_propagation(),
        )
    }

    /// Two-way link addressed by GET (DNS names, IPs, shared configuration).
    pub fn coupled(
        item_type: impl Into<String>,
        key: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::new(Query::get(item_type, key, scope), BlastPropagation::BOTH)
    }

    pub fn method(&self) -> QueryMethod {
        self.query.method
    }
}
