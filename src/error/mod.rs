//! Error taxonomy shared by wrappers, adapters and the graph builder.
//!
//! Wrapper errors bubble through the adapter unchanged; the only
//! classification the engine relies on is [`DiscoveryError::is_not_found`],
//! which separates "confirmed absent" from "could not determine".

mod key;
mod validation;

pub use key::KeyError;
pub use validation::ValidationError;

use thiserror::Error;

use crate::item::QueryMethod;

/// Opaque upstream cause, preserved for callers that want to inspect it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("{item_type} '{query}' not found in scope {scope}")]
    NotFound {
        item_type: String,
        scope: String,
        query: String,
    },

    #[error("scope '{scope}' is not served by the {item_type} adapter")]
    NoScope { item_type: String, scope: String },

    #[error("no adapter registered for type '{item_type}'")]
    NoAdapter { item_type: String },

    #[error("an adapter for type '{item_type}' is already registered")]
    DuplicateAdapter { item_type: String },

    #[error("{item_type} adapter does not support {method}")]
    UnsupportedOperation {
        item_type: String,
        method: QueryMethod,
    },

    #[error("upstream request for {item_type} failed: {source}")]
    Upstream {
        item_type: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("query cancelled")]
    Cancelled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,
}

impl DiscoveryError {
    pub fn not_found(
        item_type: impl Into<String>,
        scope: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            item_type: item_type.into(),
            scope: scope.into(),
            query: query.into(),
        }
    }

    pub fn no_scope(item_type: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::NoScope {
            item_type: item_type.into(),
            scope: scope.into(),
        }
    }

    pub fn unsupported(item_type: impl Into<String>, method: QueryMethod) -> Self {
        Self::UnsupportedOperation {
            item_type: item_type.into(),
            method,
        }
    }

    pub fn upstream(item_type: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Upstream {
            item_type: item_type.into(),
            source: source.into(),
        }
    }

    /// The backend confirmed the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The caller gave up on the query, either explicitly or by deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
