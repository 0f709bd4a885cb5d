//! Adapters: the uniform query surface over wrappers.
//!
//! [`WrapperToAdapter`] turns any [`Wrapper`] into an [`Adapter`]. It owns
//! the discipline every kind shares:
//!
//! - reject scopes the wrapper does not serve
//! - answer from the cache when allowed
//! - race backend work against the query's cancellation and deadline
//! - validate what the wrapper returns
//! - store successful results, and evict on confirmed absence

mod wrapper;

pub use wrapper::{ListableWrapper, SearchableWrapper, Wrapper};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::cache::{Cache, CacheKey, Cached};
use crate::context::QueryContext;
use crate::error::{DiscoveryError, Result, ValidationError};
use crate::item::{Item, QueryMethod};
use crate::scope;

/// Cache lifetime used when neither the wrapper nor the caller picks one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Optional query methods an adapter supports. GET is always supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub list: bool,
    pub search: bool,
}

impl Capabilities {
    pub fn supports(&self, method: QueryMethod) -> bool {
        match method {
            QueryMethod::Get => true,
            QueryMethod::List => self.list,
            QueryMethod::Search => self.search,
        }
    }
}

#[async_trait]
pub trait Adapter: Send + Sync {
    fn item_type(&self) -> &str;

    fn scopes(&self) -> &[String];

    fn capabilities(&self) -> Capabilities;

    fn potential_links(&self) -> &[&'static str];

    async fn get(
        &self,
        ctx: &QueryContext,
        scope: &str,
        query: &str,
        ignore_cache: bool,
    ) -> Result<Item>;

    /// Every item in `scope`, or in every served scope for `*`.
    async fn list(&self, ctx: &QueryContext, scope: &str, ignore_cache: bool) -> Result<Vec<Item>>;

    async fn search(
        &self,
        ctx: &QueryContext,
        scope: &str,
        query: &str,
        ignore_cache: bool,
    ) -> Result<Vec<Item>>;
}

/// Adapter over a single wrapper and a (possibly shared) cache.
pub struct WrapperToAdapter<W> {
    wrapper: W,
    scopes: Vec<String>,
    cache: Arc<dyn Cache>,
    default_ttl: Duration,
}

impl<W: Wrapper> WrapperToAdapter<W> {
    pub fn new(wrapper: W, cache: Arc<dyn Cache>) -> Self {
        let scopes = wrapper.scopes();
        Self {
            wrapper,
            scopes,
            cache,
            default_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Cache lifetime for kinds that do not choose their own.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn wrapper(&self) -> &W {
        &self.wrapper
    }

    fn cache_ttl(&self) -> Duration {
        self.wrapper.default_cache_ttl().unwrap_or(self.default_ttl)
    }

    fn check_scope(&self, scope: &str) -> Result<()> {
        if self.scopes.iter().any(|s| s == scope) {
            Ok(())
        } else {
            Err(DiscoveryError::no_scope(self.wrapper.item_type(), scope))
        }
    }

    /// Scopes a LIST or SEARCH fans out to.
    fn resolve_scopes<'s>(&'s self, scope: &'s str) -> Result<Vec<&'s str>> {
        if scope::is_wildcard(scope) {
            return Ok(self.scopes.iter().map(String::as_str).collect());
        }
        self.check_scope(scope)?;
        Ok(vec![scope])
    }

    /// Validate a wrapper result against the request that produced it.
    fn check_item(&self, item: &Item, scope: &str) -> Result<()> {
        item.validate()?;

        let expected = self.wrapper.item_type();
        if item.item_type() != expected {
            return Err(ValidationError::TypeMismatch {
                expected: expected.to_string(),
                found: item.item_type().to_string(),
            }
            .into());
        }
        if item.scope() != scope {
            return Err(ValidationError::ScopeMismatch {
                item_type: expected.to_string(),
                expected: scope.to_string(),
                found: item.scope().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn store(&self, key: CacheKey, value: Cached) {
        if let Err(e) = self.cache.put(key, value, self.cache_ttl()) {
            tracing::warn!("Failed to cache {} result: {}", self.wrapper.item_type(), e);
        }
    }

    fn cached_items(&self, key: &CacheKey, ignore_cache: bool) -> Option<Vec<Item>> {
        if ignore_cache {
            return None;
        }
        match self.cache.get(key) {
            Some(Cached::Items(items)) => {
                tracing::debug!("Cache hit: {} {} in {}", key.method, key.item_type, key.scope);
                Some(items)
            }
            _ => None,
        }
    }

    /// Drain a wrapper stream under the query context, then cache each
    /// item under its own GET key and the whole result under `key`.
    async fn collect<'a>(
        &'a self,
        ctx: &'a QueryContext,
        scope: &'a str,
        key: CacheKey,
        mut stream: BoxStream<'a, Result<Item>>,
    ) -> Result<Vec<Item>> {
        let items = ctx
            .run(async {
                let mut items = Vec::new();
                while let Some(item) = stream.next().await {
                    let item = item?;
                    self.check_item(&item, scope)?;
                    items.push(item);
                }
                Ok(items)
            })
            .await?;

        tracing::debug!(
            query_id = %ctx.id(),
            "{} {} in {}: {} items",
            key.method,
            key.item_type,
            scope,
            items.len()
        );

        for item in &items {
            self.store(CacheKey::for_item(item), Cached::Item(item.clone()));
        }
        self.store(key, Cached::Items(items.clone()));
        Ok(items)
    }
}

#[async_trait]
impl<W: Wrapper> Adapter for WrapperToAdapter<W> {
    fn item_type(&self) -> &str {
        self.wrapper.item_type()
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            list: self.wrapper.as_listable().is_some(),
            search: self.wrapper.as_searchable().is_some(),
        }
    }

    fn potential_links(&self) -> &[&'static str] {
        self.wrapper.potential_links()
    }

    async fn get(
        &self,
        ctx: &QueryContext,
        scope: &str,
        query: &str,
        ignore_cache: bool,
    ) -> Result<Item> {
        self.check_scope(scope)?;

        let key = CacheKey::get(self.wrapper.item_type(), scope, query);
        if !ignore_cache {
            if let Some(Cached::Item(item)) = self.cache.get(&key) {
                tracing::debug!("Cache hit: GET {} '{}' in {}", key.item_type, query, scope);
                return Ok(item);
            }
        }

        let item = match ctx.run(self.wrapper.get(ctx, scope, query)).await {
            Ok(item) => item,
            Err(e) => {
                if e.is_not_found() {
                    // confirmed absent: any earlier positive result is stale
                    self.cache.invalidate(&key);
                }
                tracing::debug!(query_id = %ctx.id(), "GET {} '{}' failed: {}", key.item_type, query, e);
                return Err(e);
            }
        };

        self.check_item(&item, scope)?;
        self.store(key, Cached::Item(item.clone()));
        Ok(item)
    }

    async fn list(&self, ctx: &QueryContext, scope: &str, ignore_cache: bool) -> Result<Vec<Item>> {
        let listable = self
            .wrapper
            .as_listable()
            .ok_or_else(|| DiscoveryError::unsupported(self.wrapper.item_type(), QueryMethod::List))?;

        let mut items = Vec::new();
        for scope in self.resolve_scopes(scope)? {
            let key = CacheKey::list(self.wrapper.item_type(), scope);
            match self.cached_items(&key, ignore_cache) {
                Some(cached) => items.extend(cached),
                None => {
                    let found = self.collect(ctx, scope, key, listable.list(ctx, scope)).await?;
                    items.extend(found);
                }
            }
        }
        Ok(items)
    }

    async fn search(
        &self,
        ctx: &QueryContext,
        scope: &str,
        query: &str,
        ignore_cache: bool,
    ) -> Result<Vec<Item>> {
        let searchable = self.wrapper.as_searchable().ok_or_else(|| {
            DiscoveryError::unsupported(self.wrapper.item_type(), QueryMethod::Search)
        })?;

        let mut items = Vec::new();
        for scope in self.resolve_scopes(scope)? {
            let key = CacheKey::search(self.wrapper.item_type(), scope, query);
            match self.cached_items(&key, ignore_cache) {
                Some(cached) => items.extend(cached),
                None => {
                    let stream = searchable.search(ctx, scope, query);
                    items.extend(self.collect(ctx, scope, key, stream).await?);
                }
            }
        }
        Ok(items)
    }
}
