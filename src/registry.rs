//! Adapter Registry - look up adapters by item type
//!
//! The registry is an explicit value built by the caller; there is no
//! process-wide instance. Downstream consumers (the graph builder, a
//! query surface) go through [`AdapterRegistry::execute`] so they never
//! care which kind they are talking to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::context::QueryContext;
use crate::error::{DiscoveryError, Result};
use crate::item::{Item, Query, QueryMethod};

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter. Each item type may be registered once.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let item_type = adapter.item_type().to_string();
        if self.adapters.contains_key(&item_type) {
            return Err(DiscoveryError::DuplicateAdapter { item_type });
        }
        tracing::debug!(
            "Registered {} adapter for {} scopes",
            item_type,
            adapter.scopes().len()
        );
        self.adapters.insert(item_type, adapter);
        Ok(())
    }

    pub fn get(&self, item_type: &str) -> Option<&Arc<dyn Adapter>> {
        self.adapters.get(item_type)
    }

    /// Like [`get`](Self::get), but a missing type is an error.
    pub fn require(&self, item_type: &str) -> Result<&Arc<dyn Adapter>> {
        self.get(item_type).ok_or_else(|| DiscoveryError::NoAdapter {
            item_type: item_type.to_string(),
        })
    }

    /// Registered item types, sorted
    pub fn item_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Run a query against the adapter for its type. GET yields one item.
    pub async fn execute(
        &self,
        ctx: &QueryContext,
        query: &Query,
        ignore_cache: bool,
    ) -> Result<Vec<Item>> {
        let adapter = self.require(&query.item_type)?;
        match query.method {
            QueryMethod::Get => adapter
                .get(ctx, &query.scope, &query.query, ignore_cache)
                .await
                .map(|item| vec![item]),
            QueryMethod::List => adapter.list(ctx, &query.scope, ignore_cache).await,
            QueryMethod::Search => {
                adapter
                    .search(ctx, &query.scope, &query.query, ignore_cache)
                    .await
            }
        }
    }
}
