//! The per-kind backend translator.
//!
//! A wrapper knows one resource kind: which scopes it serves, how to fetch
//! a resource and turn it into an [`Item`], and which other items that
//! resource links to. Listing and searching are optional capabilities a
//! wrapper opts into by implementing [`ListableWrapper`] or
//! [`SearchableWrapper`] and returning `Some(self)` from the matching probe.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::context::QueryContext;
use crate::error::Result;
use crate::item::Item;

#[async_trait]
pub trait Wrapper: Send + Sync {
    fn item_type(&self) -> &str;

    /// Every scope this wrapper can answer for.
    fn scopes(&self) -> Vec<String>;

    /// Fetch one resource by its unique attribute value.
    ///
    /// A resource the backend confirms absent is `DiscoveryError::NotFound`.
    async fn get(&self, ctx: &QueryContext, scope: &str, query: &str) -> Result<Item>;

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        None
    }

    fn as_searchable(&self) -> Option<&dyn SearchableWrapper> {
        None
    }

    /// Cache lifetime for this kind, overriding the adapter default.
    fn default_cache_ttl(&self) -> Option<Duration> {
        None
    }

    /// Item types this kind may emit links to.
    fn potential_links(&self) -> &[&'static str] {
        &[]
    }
}

pub trait ListableWrapper: Wrapper {
    /// Stream every resource in `scope`.
    fn list<'a>(&'a self, ctx: &'a QueryContext, scope: &'a str) -> BoxStream<'a, Result<Item>>;
}

pub trait SearchableWrapper: Wrapper {
    /// Stream the resources in `scope` matching a kind-specific query.
    fn search<'a>(
        &'a self,
        ctx: &'a QueryContext,
        scope: &'a str,
        query: &'a str,
    ) -> BoxStream<'a, Result<Item>>;
}
