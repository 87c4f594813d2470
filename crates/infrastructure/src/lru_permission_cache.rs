use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use farmgate_application::{CacheLookup, PermissionCache, ResolveToken};
use farmgate_core::{AppResult, FarmId, UserId};
use farmgate_domain::CapabilitySet;
use lru::LruCache;
use tokio::sync::Mutex;

type CacheKey = (UserId, FarmId);

/// Invalidation records older than this many epochs are pruned; the entry TTL
/// bounds any resolution outstanding that long.
const LEDGER_LIMIT: usize = 1024;

struct CacheEntry {
    capabilities: CapabilitySet,
    expires_at: Instant,
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    epoch: u64,
    invalidated: HashMap<CacheKey, u64>,
}

/// Bounded LRU adapter for resolved permission sets.
///
/// Entries carry a TTL so cached sets stay advisory, and every invalidation
/// advances an epoch recorded per key: a `put` whose token predates the key's
/// last invalidation is dropped, which keeps reads monotonic per key once an
/// invalidation has completed. All three operations take the one lock, so
/// each is atomic with respect to the others.
pub struct LruPermissionCache {
    state: Mutex<CacheState>,
    ttl: Duration,
}

impl LruPermissionCache {
    /// Creates a cache bounded to `capacity` entries with the given entry ttl.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                epoch: 0,
                invalidated: HashMap::new(),
            }),
            ttl,
        }
    }
}

#[async_trait]
impl PermissionCache for LruPermissionCache {
    async fn get(&self, user_id: UserId, farm_id: FarmId) -> AppResult<CacheLookup> {
        let mut state = self.state.lock().await;
        let key = (user_id, farm_id);
        let now = Instant::now();

        let expired = match state.entries.get(&key) {
            Some(entry) if entry.expires_at > now => {
                return Ok(CacheLookup::Hit(entry.capabilities.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.pop(&key);
        }

        Ok(CacheLookup::Miss(ResolveToken::new(state.epoch)))
    }

    async fn put(
        &self,
        user_id: UserId,
        farm_id: FarmId,
        capabilities: CapabilitySet,
        token: ResolveToken,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let key = (user_id, farm_id);

        // The resolution began before the key was last invalidated; its value
        // may predate the write that triggered the invalidation.
        if state
            .invalidated
            .get(&key)
            .is_some_and(|tick| *tick > token.epoch())
        {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or(now);
        state.entries.push(key, CacheEntry {
            capabilities,
            expires_at,
        });

        Ok(())
    }

    async fn invalidate(&self, user_id: UserId, farm_id: FarmId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let key = (user_id, farm_id);

        state.epoch += 1;
        let tick = state.epoch;
        state.invalidated.insert(key, tick);
        state.entries.pop(&key);

        if state.invalidated.len() > LEDGER_LIMIT {
            let cutoff = tick.saturating_sub(LEDGER_LIMIT as u64);
            state.invalidated.retain(|_, recorded| *recorded > cutoff);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use farmgate_application::{CacheLookup, PermissionCache, ResolveToken};
    use farmgate_core::{FarmId, UserId};
    use farmgate_domain::{Capability, CapabilitySet, Role};

    use super::LruPermissionCache;

    fn cache(capacity: usize) -> LruPermissionCache {
        LruPermissionCache::new(
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            Duration::from_secs(60),
        )
    }

    fn worker_set() -> CapabilitySet {
        Role::Worker.default_capabilities()
    }

    async fn miss_token(cache: &LruPermissionCache, user: UserId, farm: FarmId) -> ResolveToken {
        match cache.get(user, farm).await {
            Ok(CacheLookup::Miss(token)) => token,
            other => panic!("expected a miss, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_the_cached_set() {
        let cache = cache(4);
        let (user, farm) = (UserId::new(), FarmId::new());

        let token = miss_token(&cache, user, farm).await;
        assert!(cache.put(user, farm, worker_set(), token).await.is_ok());

        let lookup = cache.get(user, farm).await;
        assert_eq!(lookup.ok(), Some(CacheLookup::Hit(worker_set())));
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted_first() {
        let cache = cache(2);
        let farm = FarmId::new();
        let (first, second, third) = (UserId::new(), UserId::new(), UserId::new());

        for user in [first, second] {
            let token = miss_token(&cache, user, farm).await;
            assert!(cache.put(user, farm, worker_set(), token).await.is_ok());
        }

        // Touch the first entry so the second is the eviction candidate.
        assert!(matches!(
            cache.get(first, farm).await,
            Ok(CacheLookup::Hit(_))
        ));

        let token = miss_token(&cache, third, farm).await;
        assert!(cache.put(third, farm, worker_set(), token).await.is_ok());

        assert!(matches!(
            cache.get(second, farm).await,
            Ok(CacheLookup::Miss(_))
        ));
        assert!(matches!(
            cache.get(first, farm).await,
            Ok(CacheLookup::Hit(_))
        ));
        assert!(matches!(
            cache.get(third, farm).await,
            Ok(CacheLookup::Hit(_))
        ));
    }

    #[tokio::test]
    async fn invalidation_wins_over_a_racing_put() {
        let cache = cache(4);
        let (user, farm) = (UserId::new(), FarmId::new());

        // The resolution starts (miss token captured), then the key is
        // invalidated before the store value comes back.
        let stale_token = miss_token(&cache, user, farm).await;
        assert!(cache.invalidate(user, farm).await.is_ok());
        assert!(
            cache
                .put(user, farm, worker_set(), stale_token)
                .await
                .is_ok()
        );

        assert!(matches!(
            cache.get(user, farm).await,
            Ok(CacheLookup::Miss(_))
        ));
    }

    #[tokio::test]
    async fn put_after_the_invalidation_is_kept() {
        let cache = cache(4);
        let (user, farm) = (UserId::new(), FarmId::new());

        assert!(cache.invalidate(user, farm).await.is_ok());

        let fresh_token = miss_token(&cache, user, farm).await;
        assert!(
            cache
                .put(user, farm, worker_set(), fresh_token)
                .await
                .is_ok()
        );

        assert!(matches!(
            cache.get(user, farm).await,
            Ok(CacheLookup::Hit(_))
        ));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_a_plain_miss() {
        let cache = LruPermissionCache::new(
            NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
            Duration::ZERO,
        );
        let (user, farm) = (UserId::new(), FarmId::new());

        let token = miss_token(&cache, user, farm).await;
        assert!(cache.put(user, farm, worker_set(), token).await.is_ok());

        assert!(matches!(
            cache.get(user, farm).await,
            Ok(CacheLookup::Miss(_))
        ));
    }

    #[tokio::test]
    async fn eviction_never_reads_as_denied_access() {
        let cache = cache(1);
        let farm = FarmId::new();
        let (kept, evicted) = (UserId::new(), UserId::new());

        let token = miss_token(&cache, evicted, farm).await;
        assert!(cache.put(evicted, farm, worker_set(), token).await.is_ok());

        let token = miss_token(&cache, kept, farm).await;
        let viewer_only: CapabilitySet = [Capability::ViewFarm].into_iter().collect();
        assert!(cache.put(kept, farm, viewer_only, token).await.is_ok());

        // The evicted key misses and can be repopulated with its real set.
        let token = miss_token(&cache, evicted, farm).await;
        assert!(cache.put(evicted, farm, worker_set(), token).await.is_ok());
        assert_eq!(
            cache.get(evicted, farm).await.ok(),
            Some(CacheLookup::Hit(worker_set()))
        );
    }
}
