use std::collections::HashSet;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use super::{Cache, CacheError, CacheKey, Cached};

/// Default upper bound on stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Cached,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache with per-entry time-to-live.
///
/// Backed by sharded maps: operations on different keys only contend when
/// they hash to the same shard, and values are swapped whole under the
/// shard lock.
pub struct TtlCache {
    entries: DashMap<CacheKey, CacheEntry>,
    // item GET key -> LIST/SEARCH keys whose result contains that item
    memberships: DashMap<CacheKey, HashSet<CacheKey>>,
    max_entries: usize,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl TtlCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            memberships: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_live(now))
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .into_iter()
            .filter(|key| self.forget(self.entries.remove_if(key, |_, entry| !entry.is_live(now))))
            .count()
    }

    fn record_memberships(&self, collection: &CacheKey, members: Vec<CacheKey>) {
        for member in members {
            self.memberships
                .entry(member)
                .or_default()
                .insert(collection.clone());
        }
    }

    /// Unlink a removed collection from the membership sets of its items.
    fn forget_memberships(&self, collection: &CacheKey, value: &Cached) {
        let Cached::Items(items) = value else {
            return;
        };
        for item in items {
            self.memberships
                .remove_if_mut(&CacheKey::for_item(item), |_, collections| {
                    collections.remove(collection);
                    collections.is_empty()
                });
        }
    }

    /// Clean up after an entry left `entries`. Returns whether one did.
    fn forget(&self, removed: Option<(CacheKey, CacheEntry)>) -> bool {
        match removed {
            Some((key, entry)) => {
                self.forget_memberships(&key, &entry.value);
                true
            }
            None => false,
        }
    }

    fn evict_if_full(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }

        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!("Cache full, purged {} expired entries", purged);
        }

        while self.entries.len() > self.max_entries {
            let soonest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            match soonest {
                Some(key) => {
                    tracing::debug!("Cache full, evicting {:?}", key);
                    self.forget(self.entries.remove(&key));
                }
                None => break,
            }
        }
    }
}

impl Cache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<Cached> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }

        // The read guard is released above; removing while holding it would
        // deadlock on the shard.
        self.forget(self.entries.remove_if(key, |_, entry| !entry.is_live(now)));
        None
    }

    fn put(&self, key: CacheKey, value: Cached, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }

        let members: Option<Vec<CacheKey>> = match &value {
            Cached::Items(items) => Some(items.iter().map(CacheKey::for_item).collect()),
            Cached::Item(_) => None,
        };

        let expires_at = Instant::now() + ttl;
        if let Some(previous) = self.entries.insert(key.clone(), CacheEntry { value, expires_at }) {
            self.forget_memberships(&key, &previous.value);
        }
        if let Some(members) = members {
            self.record_memberships(&key, members);
        }
        self.evict_if_full();

        Ok(())
    }

    fn invalidate(&self, key: &CacheKey) {
        self.forget(self.entries.remove(key));

        if let Some((_, collections)) = self.memberships.remove(key) {
            for collection in collections {
                self.forget(self.entries.remove(&collection));
            }
        }
    }

    fn invalidate_scope(&self, scope: &str) {
        self.entries.retain(|key, _| key.scope != scope);
        self.memberships.retain(|key, collections| {
            if key.scope == scope {
                return false;
            }
            collections.retain(|collection| collection.scope != scope);
            !collections.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(60);

    fn disk(name: &str) -> Item {
        Item::builder("gcp-compute-disk", "name")
            .scope("proj.us-central1-a")
            .attribute("name", name)
            .build()
            .unwrap()
    }

    fn disk_key(name: &str) -> CacheKey {
        CacheKey::get("gcp-compute-disk", "proj.us-central1-a", name)
    }

    #[test]
    fn test_cache_miss_when_no_entry_exists() {
        let cache = TtlCache::default();
        assert!(cache.get(&disk_key("disk1")).is_none());
    }

    #[test]
    fn test_cache_hit_after_put() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), TTL)
            .unwrap();
        assert_eq!(cache.get(&disk_key("disk1")), Some(Cached::Item(disk("disk1"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), Duration::from_millis(500))
            .unwrap();

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(cache.get(&disk_key("disk1")).is_some(), "cached at 200ms");

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(cache.get(&disk_key("disk1")).is_none(), "expired at 600ms");
        assert!(cache.is_empty(), "expired entry is dropped on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), Duration::from_secs(2))
            .unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), Duration::from_secs(2))
            .unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert!(cache.get(&disk_key("disk1")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("short"), Cached::Item(disk("short")), Duration::from_secs(1))
            .unwrap();
        cache
            .put(disk_key("long"), Cached::Item(disk("long")), Duration::from_secs(60))
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), Duration::ZERO)
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_single_key() {
        let cache = TtlCache::default();
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), TTL)
            .unwrap();
        cache
            .put(disk_key("disk2"), Cached::Item(disk("disk2")), TTL)
            .unwrap();

        cache.invalidate(&disk_key("disk1"));

        assert!(cache.get(&disk_key("disk1")).is_none());
        assert!(cache.get(&disk_key("disk2")).is_some());
    }

    #[test]
    fn test_invalidating_member_drops_collections() {
        let cache = TtlCache::default();
        let list_key = CacheKey::list("gcp-compute-disk", "proj.us-central1-a");
        let search_key = CacheKey::search("gcp-compute-disk", "proj.us-central1-a", "ssd");
        let other_list = CacheKey::list("gcp-compute-disk", "proj.europe-west1-b");

        cache
            .put(list_key.clone(), Cached::Items(vec![disk("disk1"), disk("disk2")]), TTL)
            .unwrap();
        cache
            .put(search_key.clone(), Cached::Items(vec![disk("disk1")]), TTL)
            .unwrap();
        cache
            .put(other_list.clone(), Cached::Items(Vec::new()), TTL)
            .unwrap();

        cache.invalidate(&disk_key("disk1"));

        assert!(cache.get(&list_key).is_none());
        assert!(cache.get(&search_key).is_none());
        assert!(cache.get(&other_list).is_some());
    }

    #[test]
    fn test_invalidate_scope() {
        let cache = TtlCache::default();
        let family_key = CacheKey::search("gcp-compute-image", "proj", "base");
        cache
            .put(disk_key("disk1"), Cached::Item(disk("disk1")), TTL)
            .unwrap();
        cache
            .put(
                CacheKey::list("gcp-compute-disk", "proj.us-central1-a"),
                Cached::Items(vec![disk("disk1")]),
                TTL,
            )
            .unwrap();
        cache
            .put(family_key.clone(), Cached::Items(Vec::new()), TTL)
            .unwrap();

        cache.invalidate_scope("proj.us-central1-a");

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&family_key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_soonest_expiring_when_full() {
        let cache = TtlCache::new(2);
        cache
            .put(disk_key("a"), Cached::Item(disk("a")), Duration::from_secs(10))
            .unwrap();
        cache
            .put(disk_key("b"), Cached::Item(disk("b")), Duration::from_secs(300))
            .unwrap();
        cache
            .put(disk_key("c"), Cached::Item(disk("c")), Duration::from_secs(600))
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&disk_key("a")).is_none());
        assert!(cache.get(&disk_key("b")).is_some());
        assert!(cache.get(&disk_key("c")).is_some());
    }

    #[test]
    fn test_concurrent_access_on_distinct_keys() {
        let cache = Arc::new(TtlCache::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let name = format!("disk-{t}-{i}");
                        cache
                            .put(disk_key(&name), Cached::Item(disk(&name)), TTL)
                            .unwrap();
                        assert_eq!(cache.get(&disk_key(&name)), Some(Cached::Item(disk(&name))));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }

    fn search_key(round: usize) -> CacheKey {
        CacheKey::search("gcp-compute-disk", "proj.us-central1-a", &format!("round-{round}"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_collections_leave_no_memberships() {
        let cache = TtlCache::new(10);

        for round in 0..100 {
            let items: Vec<Item> = (0..50).map(|i| disk(&format!("disk-{round}-{i}"))).collect();
            cache
                .put(search_key(round), Cached::Items(items), Duration::from_secs(1))
                .unwrap();

            tokio::time::advance(Duration::from_secs(2)).await;
            cache.purge_expired();
        }

        assert!(cache.is_empty());
        assert!(cache.memberships.is_empty(), "memberships={}", cache.memberships.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_and_lazy_expiry_prune_memberships() {
        let cache = TtlCache::new(2);
        let evicted = search_key(0);
        cache
            .put(evicted.clone(), Cached::Items(vec![disk("a")]), Duration::from_secs(10))
            .unwrap();
        cache
            .put(search_key(1), Cached::Items(vec![disk("b")]), Duration::from_secs(60))
            .unwrap();
        cache
            .put(search_key(2), Cached::Items(vec![disk("c")]), Duration::from_secs(120))
            .unwrap();

        assert!(cache.get(&evicted).is_none());
        assert!(!cache.memberships.contains_key(&disk_key("a")));

        tokio::time::advance(Duration::from_secs(90)).await;
        assert!(cache.get(&search_key(1)).is_none());
        assert!(!cache.memberships.contains_key(&disk_key("b")));
        assert!(cache.memberships.contains_key(&disk_key("c")));
    }

    #[test]
    fn test_overwritten_collection_drops_old_members() {
        let cache = TtlCache::default();
        let list_key = CacheKey::list("gcp-compute-disk", "proj.us-central1-a");
        cache
            .put(list_key.clone(), Cached::Items(vec![disk("disk1"), disk("disk2")]), TTL)
            .unwrap();
        cache
            .put(list_key.clone(), Cached::Items(vec![disk("disk2")]), TTL)
            .unwrap();

        assert!(!cache.memberships.contains_key(&disk_key("disk1")));

        // disk1 left the list, so invalidating it keeps the list
        cache.invalidate(&disk_key("disk1"));
        assert!(cache.get(&list_key).is_some());

        cache.invalidate(&disk_key("disk2"));
        assert!(cache.get(&list_key).is_none());
        assert!(cache.memberships.is_empty());
    }

    #[test]
    fn test_concurrent_put_and_get_on_same_key_never_tears() {
        let cache = Arc::new(TtlCache::default());
        let key = CacheKey::list("gcp-compute-disk", "proj.us-central1-a");
        let small = Cached::Items(vec![disk("disk1")]);
        let large = Cached::Items((0..20).map(|i| disk(&format!("disk-{i}"))).collect());

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                let values = [small.clone(), large.clone()];
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let value = values[(t + i) % 2].clone();
                        cache.put(key.clone(), value, TTL).unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                let values = [small.clone(), large.clone()];
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(hit) = cache.get(&key) {
                            assert!(values.contains(&hit), "torn read: {hit:?}");
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
        let last = cache.get(&key).unwrap();
        assert!(last == small || last == large);
    }
}
