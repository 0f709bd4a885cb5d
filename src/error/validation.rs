use thiserror::Error;

use crate::item::QueryMethod;

/// An item broke one of the invariants every wrapper must uphold.
///
/// These always point at a wrapper bug, so the adapter fails the whole
/// query instead of dropping the offending item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("item has an empty type")]
    EmptyType,

    #[error("{item_type} item has an empty scope")]
    EmptyScope { item_type: String },

    #[error("{item_type} item does not name a unique attribute")]
    EmptyUniqueAttribute { item_type: String },

    #[error("{item_type} item has no value for unique attribute '{attribute}'")]
    MissingUniqueAttributeValue {
        item_type: String,
        attribute: String,
    },

    #[error("expected a {expected} item, wrapper returned {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("{item_type} item was requested in scope {expected} but reports {found}")]
    ScopeMismatch {
        item_type: String,
        expected: String,
        found: String,
    },

    #[error("{item_type} linked item query #{index} has an empty {field}")]
    EmptyLinkedQueryField {
        item_type: String,
        index: usize,
        field: &'static str,
    },

    #[error("{item_type} linked item query #{index} uses {method}; only GET and SEARCH may link")]
    InvalidLinkMethod {
        item_type: String,
        index: usize,
        method: QueryMethod,
    },
}

impl ValidationError {
    pub fn empty_link_field(item_type: impl Into<String>, index: usize, field: &'static str) -> Self {
        Self::EmptyLinkedQueryField {
            item_type: item_type.into(),
            index,
            field,
        }
    }
}
