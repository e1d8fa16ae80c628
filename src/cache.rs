/// Full-page response cache
///
/// The home page caches its rendered HTML for a short window. The cache is
/// an opaque body store keyed by a fixed string, not a data cache: within
/// the TTL the previously rendered bytes are returned even if the
/// underlying posts changed. Handlers take the cache as a collaborator so
/// tests can substitute a deterministic-clock implementation.
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};

/// Cache key for the rendered home page. A single key: the cached body does
/// not vary on query parameters.
pub const INDEX_PAGE_KEY: &str = "page:index";

#[async_trait]
pub trait PageCache: Send + Sync {
    /// Return the cached body if present and fresh.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Store a rendered body for `ttl`.
    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()>;
    /// Drop a cached body; absence is not an error.
    async fn clear(&self, key: &str) -> Result<()>;
}

/// Production cache backed by Redis
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        let body: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        if body.is_some() {
            tracing::debug!(%key, "page cache HIT");
        } else {
            tracing::debug!(%key, "page cache MISS");
        }
        Ok(body)
    }

    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, body, ttl.as_secs())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        tracing::debug!(%key, ttl_secs = ttl.as_secs(), "page cache WRITE");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        tracing::debug!(%key, "page cache CLEAR");
        Ok(())
    }
}

/// Clock seam for the in-memory cache
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock advanced by hand; lets tests cross the TTL boundary without
/// sleeping.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// In-process cache used by tests and redis-less deployments
pub struct InMemoryPageCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryPageCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryPageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageCache for InMemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some((body, deadline)) if *deadline > now => Ok(Some(body.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()> {
        let deadline = self.clock.now() + ttl;
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.to_string(), (body.to_string(), deadline));
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// Cache that never hits; for tests exercising handlers without caching
pub struct NoopPageCache;

#[async_trait]
impl PageCache for NoopPageCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _body: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn clear(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_respects_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = InMemoryPageCache::with_clock(clock.clone());

        cache
            .set(INDEX_PAGE_KEY, "<html>v1</html>", Duration::from_secs(20))
            .await
            .unwrap();
        assert_eq!(
            cache.get(INDEX_PAGE_KEY).await.unwrap().as_deref(),
            Some("<html>v1</html>")
        );

        clock.advance(Duration::from_secs(19));
        assert!(cache.get(INDEX_PAGE_KEY).await.unwrap().is_some());

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(INDEX_PAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let cache = InMemoryPageCache::new();
        cache.clear(INDEX_PAGE_KEY).await.unwrap();
        cache
            .set(INDEX_PAGE_KEY, "body", Duration::from_secs(20))
            .await
            .unwrap();
        cache.clear(INDEX_PAGE_KEY).await.unwrap();
        assert!(cache.get(INDEX_PAGE_KEY).await.unwrap().is_none());
        cache.clear(INDEX_PAGE_KEY).await.unwrap();
    }

    #[test]
    fn index_key_is_query_independent() {
        // the home page is cached under one fixed key
        assert_eq!(INDEX_PAGE_KEY, "page:index");
    }
}
