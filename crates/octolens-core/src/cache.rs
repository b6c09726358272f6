//! Memoizes resolved resources for the lifetime of an engine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tracing::debug;

use crate::error::Result;
use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

/// Identifies one resolution: where it ran, what kind was looked up and the
/// name exactly as the caller typed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub server_url: String,
    pub space_id: String,
    pub kind: ResourceKind,
    /// Owning project for project-scoped collections.
    pub project_id: Option<String>,
    pub name: String,
}

impl CacheKey {
    /// Key for `name` looked up in `collection` of the scoped space.
    pub fn new(scope: &SpaceScope, collection: &Collection, name: &str) -> Self {
        Self {
            server_url: scope.server_url.clone(),
            space_id: scope.space_id.clone(),
            kind: collection.kind,
            project_id: collection.project_id.clone(),
            name: name.to_string(),
        }
    }
}

/// Entries are never evicted or refreshed. Failed resolutions are not stored.
///
/// Concurrent misses on the same key may both run the resolver; the last one
/// to finish wins.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<CacheKey, ResourceRef>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the cached resolution for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<ResourceRef> {
        self.lock().get(key).cloned()
    }

    /// Remember a resolution. An existing entry for `key` is replaced.
    pub fn insert(&self, key: CacheKey, resource: ResourceRef) {
        self.lock().insert(key, resource);
    }

    /// Cached value for `key`, or the result of `resolve`. Only successes are
    /// stored.
    pub async fn get_or_resolve<F, Fut>(&self, key: CacheKey, resolve: F) -> Result<ResourceRef>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResourceRef>>,
    {
        if let Some(hit) = self.get(&key) {
            debug!(kind = %key.kind, name = %key.name, "resolution cache hit");
            return Ok(hit);
        }

        debug!(kind = %key.kind, name = %key.name, "resolution cache miss");
        let resource = resolve().await?;
        self.insert(key, resource.clone());
        Ok(resource)
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written map behind.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, ResourceRef>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;

    fn scope() -> SpaceScope {
        SpaceScope::new("https://octopus.example", "Spaces-1")
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = ResolutionCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let key = CacheKey::new(&scope(), &Collection::of(ResourceKind::Environment), "Prod");
        let resolve = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResourceRef::new(ResourceKind::Environment, "Environments-1", "Production"))
        };

        let first = cache.get_or_resolve(key.clone(), resolve).await.unwrap();
        let second = cache.get_or_resolve(key, resolve).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ResolutionCache::new();
        let key = CacheKey::new(&scope(), &Collection::of(ResourceKind::Tenant), "Acme");

        let err = cache
            .get_or_resolve(key.clone(), || async {
                Err(Error::not_found(ResourceKind::Tenant, "Acme"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());

        let found = cache
            .get_or_resolve(key, || async {
                Ok(ResourceRef::new(ResourceKind::Tenant, "Tenants-1", "Acme"))
            })
            .await
            .unwrap();
        assert_eq!(found.id, "Tenants-1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn owning_project_separates_keys() {
        let a = CacheKey::new(
            &scope(),
            &Collection::in_project(ResourceKind::Runbook, "Projects-1"),
            "Backup",
        );
        let b = CacheKey::new(
            &scope(),
            &Collection::in_project(ResourceKind::Runbook, "Projects-2"),
            "Backup",
        );
        assert_ne!(a, b);
    }

    #[test]
    fn queried_name_is_kept_verbatim() {
        let collection = Collection::of(ResourceKind::Project);
        assert_ne!(
            CacheKey::new(&scope(), &collection, "Web"),
            CacheKey::new(&scope(), &collection, "web ")
        );
    }
}
