use std::time::Duration;

use super::{Cache, CacheError, CacheKey, Cached};

/// Always misses and never stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl Cache for NoOpCache {
    fn get(&self, _key: &CacheKey) -> Option<Cached> {
        None
    }

    fn put(&self, _key: CacheKey, _value: Cached, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn invalidate(&self, _key: &CacheKey) {}

    fn invalidate_scope(&self, _scope: &str) {}
}
