//! Adapter behaviour against in-memory wrappers
//!
//! The wrappers here count backend calls so each test can tell a cache
//! hit from a backend round trip.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use pretty_assertions::assert_eq;
use tgcp_discovery::cache::CacheError;
use tgcp_discovery::{
    key, Adapter, BlastPropagation, Cache, CacheKey, Cached, Capabilities, DiscoveryError, Item,
    LinkedItemQuery, ListableWrapper, NoOpCache, QueryContext, QueryMethod, Result,
    SearchableWrapper, TtlCache, Wrapper, WrapperToAdapter,
};

const PROJECT: &str = "test-project";
const IMAGE: &str = "gcp-compute-image";
const DATABASE: &str = "gcp-sql-admin-database";

/// Images held in memory; `slow` makes every call wait for a release.
#[derive(Default)]
struct FakeImages {
    images: Mutex<HashMap<String, Item>>,
    calls: AtomicUsize,
    release: tokio::sync::Notify,
    slow: AtomicBool,
}

impl FakeImages {
    fn with_image(name: &str) -> Self {
        let fake = Self::default();
        fake.insert(image(name));
        fake
    }

    fn insert(&self, item: Item) {
        let name = item.unique_attribute_value().unwrap_or_default();
        self.images.lock().unwrap().insert(name, item);
    }

    fn remove(&self, name: &str) {
        self.images.lock().unwrap().remove(name);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
    }
}

fn image(name: &str) -> Item {
    Item::builder(IMAGE, "name")
        .scope(PROJECT)
        .attribute("name", name)
        .link(LinkedItemQuery::dependency(
            "gcp-compute-disk",
            "disk1",
            "test-project.us-central1-a",
        ))
        .build()
        .unwrap()
}

#[async_trait]
impl Wrapper for FakeImages {
    fn item_type(&self) -> &str {
        IMAGE
    }

    fn scopes(&self) -> Vec<String> {
        vec![PROJECT.to_string()]
    }

    async fn get(&self, _ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        self.call().await;
        self.images
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| DiscoveryError::not_found(IMAGE, scope, query))
    }

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        Some(self)
    }
}

impl ListableWrapper for FakeImages {
    fn list<'a>(&'a self, _ctx: &'a QueryContext, _scope: &'a str) -> BoxStream<'a, Result<Item>> {
        stream::once(self.call())
            .flat_map(move |()| {
                let mut items: Vec<Item> = self.images.lock().unwrap().values().cloned().collect();
                items.sort_by_key(|item| item.unique_attribute_value());
                stream::iter(items.into_iter().map(Ok))
            })
            .boxed()
    }
}

/// Databases of one instance, searchable by instance name only.
struct FakeDatabases {
    calls: AtomicUsize,
}

fn database(instance: &str, name: &str) -> Item {
    Item::builder(DATABASE, "uniqueAttr")
        .scope(PROJECT)
        .attribute("name", name)
        .attribute("instance", instance)
        .attribute("uniqueAttr", key::compose(&[instance, name]).unwrap())
        .link(LinkedItemQuery::dependency("gcp-sql-admin-instance", instance, PROJECT))
        .build()
        .unwrap()
}

#[async_trait]
impl Wrapper for FakeDatabases {
    fn item_type(&self) -> &str {
        DATABASE
    }

    fn scopes(&self) -> Vec<String> {
        vec![PROJECT.to_string()]
    }

    async fn get(&self, _ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (instance, name) = key::decompose_pair(query)?;
        if instance == "server1" && name == "db1" {
            Ok(database(&instance, &name))
        } else {
            Err(DiscoveryError::not_found(DATABASE, scope, query))
        }
    }

    fn as_searchable(&self) -> Option<&dyn SearchableWrapper> {
        Some(self)
    }
}

impl SearchableWrapper for FakeDatabases {
    fn search<'a>(
        &'a self,
        _ctx: &'a QueryContext,
        _scope: &'a str,
        query: &'a str,
    ) -> BoxStream<'a, Result<Item>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items = if query == "server1" {
            vec![Ok(database("server1", "db1")), Ok(database("server1", "db2"))]
        } else {
            Vec::new()
        };
        stream::iter(items).boxed()
    }
}

/// Yields one image, then stalls until released; listable and searchable.
#[derive(Default)]
struct StallingImages {
    stalled: AtomicUsize,
    release: tokio::sync::Notify,
}

impl StallingImages {
    fn first_then_stall(&self) -> BoxStream<'_, Result<Item>> {
        stream::iter(vec![Ok(image("img1"))])
            .chain(stream::once(async move {
                self.stalled.fetch_add(1, Ordering::SeqCst);
                self.release.notified().await;
                Ok(image("img2"))
            }))
            .boxed()
    }
}

#[async_trait]
impl Wrapper for StallingImages {
    fn item_type(&self) -> &str {
        IMAGE
    }

    fn scopes(&self) -> Vec<String> {
        vec![PROJECT.to_string()]
    }

    async fn get(&self, _ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        Err(DiscoveryError::not_found(IMAGE, scope, query))
    }

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        Some(self)
    }

    fn as_searchable(&self) -> Option<&dyn SearchableWrapper> {
        Some(self)
    }
}

impl ListableWrapper for StallingImages {
    fn list<'a>(&'a self, _ctx: &'a QueryContext, _scope: &'a str) -> BoxStream<'a, Result<Item>> {
        self.first_then_stall()
    }
}

impl SearchableWrapper for StallingImages {
    fn search<'a>(
        &'a self,
        _ctx: &'a QueryContext,
        _scope: &'a str,
        _query: &'a str,
    ) -> BoxStream<'a, Result<Item>> {
        self.first_then_stall()
    }
}

/// A cache whose writes always fail.
struct BrokenCache;

impl Cache for BrokenCache {
    fn get(&self, _key: &CacheKey) -> Option<Cached> {
        None
    }

    fn put(&self, _key: CacheKey, _value: Cached, _ttl: Duration) -> std::result::Result<(), CacheError> {
        Err(CacheError::Storage("disk full".to_string()))
    }

    fn invalidate(&self, _key: &CacheKey) {}

    fn invalidate_scope(&self, _scope: &str) {}
}

fn ttl_adapter<W: Wrapper>(wrapper: W) -> (WrapperToAdapter<W>, Arc<TtlCache>) {
    let cache = Arc::new(TtlCache::default());
    (WrapperToAdapter::new(wrapper, cache.clone()), cache)
}

mod get_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Two gets for the same image hit the backend once
    #[tokio::test]
    async fn test_image_second_get_served_from_cache() {
        let (adapter, _cache) = ttl_adapter(FakeImages::with_image("img1"));
        let ctx = QueryContext::new();

        let first = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        let second = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(adapter.wrapper().calls(), 1);

        let links = first.linked_item_queries();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].query.method, QueryMethod::Get);
        assert_eq!(links[0].blast_propagation, BlastPropagation::INBOUND);
    }

    /// A missing item is not cached and a later get succeeds once it exists
    #[tokio::test]
    async fn test_not_found_is_never_cached() {
        let (adapter, cache) = ttl_adapter(FakeImages::default());
        let ctx = QueryContext::new();

        let err = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());

        adapter.wrapper().insert(image("img1"));
        let item = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        assert_eq!(item.unique_attribute_value().as_deref(), Some("img1"));
        assert_eq!(adapter.wrapper().calls(), 2);
    }

    /// A confirmed absence evicts the stale positive entry
    #[tokio::test]
    async fn test_not_found_evicts_stale_entry() {
        let (adapter, cache) = ttl_adapter(FakeImages::with_image("img1"));
        let ctx = QueryContext::new();

        adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        adapter.wrapper().remove("img1");

        let err = adapter.get(&ctx, PROJECT, "img1", true).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.get(&CacheKey::get(IMAGE, PROJECT, "img1")).is_none());

        let err = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(adapter.wrapper().calls(), 3);
    }

    /// A failing cache write never masks the fetched item
    #[tokio::test]
    async fn test_cache_write_failure_still_returns_item() {
        let adapter = WrapperToAdapter::new(FakeImages::with_image("img1"), Arc::new(BrokenCache));
        let item = adapter
            .get(&QueryContext::new(), PROJECT, "img1", false)
            .await
            .unwrap();
        assert_eq!(item, image("img1"));
    }

    /// The no-op strategy sends every get to the backend
    #[tokio::test]
    async fn test_noop_cache_always_misses() {
        let adapter = WrapperToAdapter::new(FakeImages::with_image("img1"), Arc::new(NoOpCache));
        let ctx = QueryContext::new();
        for _ in 0..3 {
            adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        }
        assert_eq!(adapter.wrapper().calls(), 3);
    }

    /// Entries expire after the adapter's cache lifetime
    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = Arc::new(TtlCache::default());
        let adapter = WrapperToAdapter::new(FakeImages::with_image("img1"), cache)
            .with_cache_ttl(Duration::from_secs(30));
        let ctx = QueryContext::new();

        adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        assert_eq!(adapter.wrapper().calls(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        adapter.get(&ctx, PROJECT, "img1", false).await.unwrap();
        assert_eq!(adapter.wrapper().calls(), 2);
    }
}

mod collection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Listed items are reachable by GET without another backend call
    #[tokio::test]
    async fn test_list_caches_each_item() {
        let fake = FakeImages::with_image("img1");
        fake.insert(image("img2"));
        let (adapter, _cache) = ttl_adapter(fake);
        let ctx = QueryContext::new();

        let items = adapter.list(&ctx, PROJECT, false).await.unwrap();
        assert_eq!(items, vec![image("img1"), image("img2")]);

        adapter.get(&ctx, PROJECT, "img2", false).await.unwrap();
        adapter.list(&ctx, PROJECT, false).await.unwrap();
        assert_eq!(adapter.wrapper().calls(), 1);
    }

    /// Invalidating a member drops the cached list that contains it
    #[tokio::test]
    async fn test_invalidating_member_drops_list() {
        let (adapter, cache) = ttl_adapter(FakeImages::with_image("img1"));
        let ctx = QueryContext::new();

        adapter.list(&ctx, PROJECT, false).await.unwrap();
        cache.invalidate(&CacheKey::get(IMAGE, PROJECT, "img1"));
        assert!(cache.get(&CacheKey::list(IMAGE, PROJECT)).is_none());

        adapter.list(&ctx, PROJECT, false).await.unwrap();
        assert_eq!(adapter.wrapper().calls(), 2);
    }

    /// Search on a kind without the capability is rejected up front
    #[tokio::test]
    async fn test_unsupported_methods_are_rejected() {
        let adapter = WrapperToAdapter::new(FakeImages::with_image("img1"), Arc::new(NoOpCache));
        assert_eq!(
            adapter.capabilities(),
            Capabilities {
                list: true,
                search: false
            }
        );

        let err = adapter
            .search(&QueryContext::new(), PROJECT, "family", false)
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(adapter.wrapper().calls(), 0);

        let databases = WrapperToAdapter::new(
            FakeDatabases {
                calls: AtomicUsize::new(0),
            },
            Arc::new(NoOpCache),
        );
        let err = databases
            .list(&QueryContext::new(), PROJECT, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::UnsupportedOperation {
                method: QueryMethod::List,
                ..
            }
        ));
    }

    /// Databases are found by instance and addressed by composite key
    #[tokio::test]
    async fn test_database_search_and_composite_get() {
        let (adapter, _cache) = ttl_adapter(FakeDatabases {
            calls: AtomicUsize::new(0),
        });
        let ctx = QueryContext::new();

        let composite = key::compose(&["server1", "db1"]).unwrap();
        assert_eq!(
            key::decompose(&composite, 2).unwrap(),
            vec!["server1".to_string(), "db1".to_string()]
        );

        let items = adapter.search(&ctx, PROJECT, "server1", false).await.unwrap();
        let keys: Vec<String> = items
            .iter()
            .filter_map(Item::unique_attribute_value)
            .collect();
        assert_eq!(keys, vec!["server1|db1", "server1|db2"]);

        // cached under its GET key by the search
        let item = adapter.get(&ctx, PROJECT, &composite, false).await.unwrap();
        assert_eq!(item, database("server1", "db1"));
        assert_eq!(adapter.wrapper().calls.load(Ordering::SeqCst), 1);
    }

    /// The wildcard scope fans out to every served scope
    #[tokio::test]
    async fn test_wildcard_list() {
        let adapter = WrapperToAdapter::new(FakeImages::with_image("img1"), Arc::new(NoOpCache));
        let items = adapter
            .list(&QueryContext::new(), "*", false)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);

        let err = adapter
            .get(&QueryContext::new(), "*", "img1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoScope { .. }));
    }
}

mod cancellation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A cancelled query returns promptly and leaves the cache untouched
    #[tokio::test]
    async fn test_cancelled_get_writes_nothing() {
        let fake = FakeImages::with_image("img1");
        fake.slow.store(true, Ordering::SeqCst);
        let (adapter, cache) = ttl_adapter(fake);
        let adapter = Arc::new(adapter);
        let ctx = QueryContext::new();

        let task = {
            let adapter = adapter.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { adapter.get(&ctx, PROJECT, "img1", false).await })
        };

        while adapter.wrapper().calls() == 0 {
            tokio::task::yield_now().await;
        }
        ctx.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DiscoveryError::Cancelled));
        assert!(cache.is_empty());
    }

    /// A query past its deadline fails with DeadlineExceeded
    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let fake = FakeImages::with_image("img1");
        fake.slow.store(true, Ordering::SeqCst);
        let (adapter, cache) = ttl_adapter(fake);
        let ctx = QueryContext::new().with_timeout(Duration::from_secs(5));

        let err = adapter.get(&ctx, PROJECT, "img1", false).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::DeadlineExceeded));
        assert!(err.is_cancelled());
        assert!(cache.is_empty());
    }

    /// Start a collection query, cancel it once the first item is in,
    /// and check nothing reached the cache
    async fn cancel_after_first_item(method: QueryMethod) {
        let (adapter, cache) = ttl_adapter(StallingImages::default());
        let adapter = Arc::new(adapter);
        let ctx = QueryContext::new();

        let task = {
            let adapter = adapter.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                match method {
                    QueryMethod::Search => adapter.search(&ctx, PROJECT, "base", false).await,
                    _ => adapter.list(&ctx, PROJECT, false).await,
                }
            })
        };

        while adapter.wrapper().stalled.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        ctx.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DiscoveryError::Cancelled));
        assert!(cache.is_empty());
        assert!(cache.get(&CacheKey::get(IMAGE, PROJECT, "img1")).is_none());
    }

    #[tokio::test]
    async fn test_cancelled_list_writes_nothing() {
        cancel_after_first_item(QueryMethod::List).await;
    }

    #[tokio::test]
    async fn test_cancelled_search_writes_nothing() {
        cancel_after_first_item(QueryMethod::Search).await;
    }
}
