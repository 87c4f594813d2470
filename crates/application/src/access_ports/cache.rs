use async_trait::async_trait;
use farmgate_core::{AppResult, FarmId, UserId};
use farmgate_domain::CapabilitySet;

/// Token handed out on a cache miss and presented back on `put`.
///
/// The token pins the resolution to the invalidation epoch it started under:
/// a `put` whose token predates a later `invalidate` of the same key is
/// discarded, so an invalidation always wins over the `put` it raced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveToken(u64);

impl ResolveToken {
    /// Creates a token for the given invalidation epoch.
    #[must_use]
    pub fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    /// Returns the invalidation epoch the resolution started under.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.0
    }
}

/// Outcome of a permission cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A fresh resolved set was cached for the key.
    Hit(CapabilitySet),
    /// Nothing usable cached; resolve from the store and `put` with the token.
    ///
    /// An evicted or expired entry surfaces here exactly like a cold key;
    /// a miss never means "no access".
    Miss(ResolveToken),
}

/// Bounded cache port for resolved permission sets, keyed by (user, farm).
///
/// These three operations are the whole surface; the orchestrator never
/// touches eviction or freshness internals.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Looks up the resolved set for one key.
    async fn get(&self, user_id: UserId, farm_id: FarmId) -> AppResult<CacheLookup>;

    /// Stores a resolved set, unless an invalidation outran the resolution.
    async fn put(
        &self,
        user_id: UserId,
        farm_id: FarmId,
        capabilities: CapabilitySet,
        token: ResolveToken,
    ) -> AppResult<()>;

    /// Drops the entry for one key and advances its invalidation epoch.
    async fn invalidate(&self, user_id: UserId, farm_id: FarmId) -> AppResult<()>;
}
