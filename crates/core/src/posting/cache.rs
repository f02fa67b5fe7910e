//! Per-tenant posting configuration cache using Moka.
//!
//! Templates and account role mappings are read on every posting but
//! change rarely. They are cached per tenant and dropped whenever a
//! configuration write commits.
//!
//! Every invalidation advances a generation counter. A load records the
//! generation before reading the store and is only cached if no
//! invalidation happened in between, so a snapshot read before a write
//! can never outlive that write's invalidation.

use moka::sync::Cache;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use ledgerpost_shared::PostingSettings;
use ledgerpost_shared::types::TenantId;

use super::template::TenantPostingConfig;

/// Default cache capacity (number of tenants).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Hook fired by configuration writers after they commit.
pub trait ConfigInvalidation: Send + Sync {
    /// Drops the cached configuration of one tenant.
    fn invalidate_tenant(&self, tenant_id: TenantId);

    /// Drops every cached configuration.
    fn invalidate_all(&self);
}

/// Invalidation generation observed before a configuration load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration(u64);

/// Cache of loaded tenant posting configurations.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct TenantConfigCache {
    cache: Cache<TenantId, Arc<TenantPostingConfig>>,
    generation: Arc<Mutex<u64>>,
}

impl TenantConfigCache {
    /// Creates a cache with default settings: 1000 tenants, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom capacity and time-to-live.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a cache sized from the posting settings.
    #[must_use]
    pub fn from_settings(settings: &PostingSettings) -> Self {
        Self::with_config(settings.config_cache_capacity, settings.config_cache_ttl_secs)
    }

    /// Returns the cached configuration of a tenant.
    #[must_use]
    pub fn get(&self, tenant_id: TenantId) -> Option<Arc<TenantPostingConfig>> {
        self.cache.get(&tenant_id)
    }

    /// Stores a freshly loaded configuration and returns the shared handle.
    pub fn insert(&self, tenant_id: TenantId, config: TenantPostingConfig) -> Arc<TenantPostingConfig> {
        let _generation = self.lock_generation();
        let config = Arc::new(config);
        self.cache.insert(tenant_id, Arc::clone(&config));
        config
    }

    /// Current invalidation generation. Take it before loading from the store.
    #[must_use]
    pub fn generation(&self) -> CacheGeneration {
        CacheGeneration(*self.lock_generation())
    }

    /// Stores a configuration loaded at `seen`, unless an invalidation has
    /// happened since. The loaded configuration is returned either way.
    pub fn insert_if_current(
        &self,
        tenant_id: TenantId,
        config: TenantPostingConfig,
        seen: CacheGeneration,
    ) -> Arc<TenantPostingConfig> {
        let generation = self.lock_generation();
        let config = Arc::new(config);
        if CacheGeneration(*generation) == seen {
            self.cache.insert(tenant_id, Arc::clone(&config));
        } else {
            debug!(tenant_id = %tenant_id, "Configuration invalidated during load, not caching");
        }
        config
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance so counts and evictions are up to date.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for TenantConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigInvalidation for TenantConfigCache {
    fn invalidate_tenant(&self, tenant_id: TenantId) {
        let mut generation = self.lock_generation();
        *generation = generation.wrapping_add(1);
        self.cache.invalidate(&tenant_id);
    }

    fn invalidate_all(&self) {
        let mut generation = self.lock_generation();
        *generation = generation.wrapping_add(1);
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::template::AccountRoleMapping;
    use ledgerpost_shared::types::AccountId;

    fn config() -> TenantPostingConfig {
        TenantPostingConfig::new(
            vec![],
            vec![AccountRoleMapping {
                role: "CASH".into(),
                module: None,
                account_id: AccountId::new(),
            }],
        )
    }

    #[test]
    fn test_insert_and_get() {
        let cache = TenantConfigCache::new();
        let tenant = TenantId::new();
        assert!(cache.get(tenant).is_none());

        let stored = cache.insert(tenant, config());
        let fetched = cache.get(tenant).unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert_eq!(fetched.mapping_count(), 1);
    }

    #[test]
    fn test_invalidate_tenant() {
        let cache = TenantConfigCache::new();
        let a = TenantId::new();
        let b = TenantId::new();
        cache.insert(a, config());
        cache.insert(b, config());

        cache.invalidate_tenant(a);
        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_some());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = TenantConfigCache::new();
        cache.insert(TenantId::new(), config());
        cache.insert(TenantId::new(), config());
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 2);

        cache.invalidate_all();
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = TenantConfigCache::new();
        let clone = cache.clone();
        let tenant = TenantId::new();
        cache.insert(tenant, config());
        assert!(clone.get(tenant).is_some());
        clone.invalidate_tenant(tenant);
        assert!(cache.get(tenant).is_none());
    }

    #[test]
    fn test_load_overtaken_by_invalidation_is_not_cached() {
        let cache = TenantConfigCache::new();
        let tenant = TenantId::new();

        let seen = cache.generation();
        cache.invalidate_tenant(tenant);
        let loaded = cache.insert_if_current(tenant, config(), seen);
        assert_eq!(loaded.mapping_count(), 1);
        assert!(cache.get(tenant).is_none());

        let seen = cache.generation();
        cache.insert_if_current(tenant, config(), seen);
        assert!(cache.get(tenant).is_some());
    }

    #[test]
    fn test_invalidate_all_advances_generation() {
        let cache = TenantConfigCache::new();
        let before = cache.generation();
        cache.invalidate_all();
        assert_ne!(cache.generation(), before);
    }

    #[test]
    fn test_from_settings() {
        let cache = TenantConfigCache::from_settings(&PostingSettings::default());
        cache.insert(TenantId::new(), config());
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 1);
    }
}
