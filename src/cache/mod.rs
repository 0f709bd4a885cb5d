//! Query cache
//!
//! Sits between an adapter and its wrapper. Entries are keyed by
//! `(type, scope, method, query)` so adapters for different kinds can share
//! one store. Two strategies are provided and picked by configuration:
//!
//! - [`NoOpCache`] - always misses, never stores; keeps adapter behaviour
//!   deterministic and every backend call observable in tests
//! - [`TtlCache`] - concurrent in-memory store with per-entry expiry
//!
//! # Example
//!
//! ```ignore
//! let cache = cache::from_config(&config.cache);
//! let adapter = WrapperToAdapter::new(DiskWrapper::new(client, "proj", zones), cache);
//! ```

mod noop;
mod ttl;

pub use noop::NoOpCache;
pub use ttl::{TtlCache, DEFAULT_MAX_ENTRIES};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{CacheConfig, CacheStrategy};
use crate::item::{Item, QueryMethod};

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub item_type: String,
    pub scope: String,
    pub method: QueryMethod,
    pub query: String,
}

impl CacheKey {
    pub fn new(
        item_type: impl Into<String>,
        scope: impl Into<String>,
        method: QueryMethod,
        query: impl Into<String>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            scope: scope.into(),
            method,
            query: query.into(),
        }
    }

    pub fn get(item_type: &str, scope: &str, query: &str) -> Self {
        Self::new(item_type, scope, QueryMethod::Get, query)
    }

    pub fn list(item_type: &str, scope: &str) -> Self {
        Self::new(item_type, scope, QueryMethod::List, "")
    }

    pub fn search(item_type: &str, scope: &str, query: &str) -> Self {
        Self::new(item_type, scope, QueryMethod::Search, query)
    }

    /// The GET key an item is reachable under.
    pub fn for_item(item: &Item) -> Self {
        Self::get(
            item.item_type(),
            item.scope(),
            &item.unique_attribute_value().unwrap_or_default(),
        )
    }
}

/// A cached GET result or a cached LIST/SEARCH result.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Item(Item),
    Items(Vec<Item>),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache storage failure: {0}")]
    Storage(String),
}

/// Storage strategy behind an adapter.
///
/// Implementations must allow concurrent access: operations on different
/// keys must not block each other and a reader must never observe a
/// partially written value. Races between `put` and `invalidate` on the
/// same key are resolved by whichever completes last.
pub trait Cache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Cached>;

    fn put(&self, key: CacheKey, value: Cached, ttl: Duration) -> Result<(), CacheError>;

    /// Drop one entry. Dropping an item's GET key also drops every
    /// collection result that contains the item.
    fn invalidate(&self, key: &CacheKey);

    /// Drop every entry in `scope`, whatever its type.
    fn invalidate_scope(&self, scope: &str);
}

/// Build the cache selected by configuration.
pub fn from_config(config: &CacheConfig) -> Arc<dyn Cache> {
    match config.strategy {
        CacheStrategy::None => Arc::new(NoOpCache),
        CacheStrategy::Ttl => Arc::new(TtlCache::new(config.max_entries)),
    }
}
