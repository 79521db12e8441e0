use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::policy::CachePolicy;
use super::storage::{MemoryStorage, Storage, StorageResult};

/// Prefix on every storage key owned by the cache.
pub const CACHE_PREFIX: &str = "portal_cache_";

/// Per-call knobs for cached reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the cache lookup and go straight to the network.
    pub force_refresh: bool,
    /// Overrides the policy TTL for the write that follows a miss.
    pub ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ttl: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    /// Logical keys, without the storage prefix.
    pub keys: Vec<String>,
}

/// TTL cache over a persistent key-value store.
///
/// Caching is best effort: storage failures are logged and behave like a
/// miss (reads) or a no-op (writes), so callers always fall through to the
/// network.
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>, policy: CachePolicy) -> Self {
        Self {
            storage,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// A cache that lives only as long as the process.
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), policy)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, key)
    }

    /// Log a storage failure and drop it.
    fn absorb<T>(&self, op: &str, key: &str, result: StorageResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(op = op, key = key, error = %e, "Cache storage error");
                None
            }
        }
    }

    /// Read the raw entry, dropping it if it has expired.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<serde_json::Value>> {
        let storage_key = Self::storage_key(key);
        let raw = self.absorb("read", key, self.storage.get_item(&storage_key))??;

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = key, error = %e, "Unreadable cache entry");
                return None;
            }
        };

        if entry.is_expired(self.clock.now_millis()) {
            debug!(key = key, "Cache entry expired");
            self.absorb("remove", key, self.storage.remove_item(&storage_key));
            return None;
        }

        Some(entry)
    }

    /// Returns the cached payload, or `None` on a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key)?;
        match serde_json::from_value(entry.data) {
            Ok(data) => {
                debug!(key = key, "Cache hit");
                Some(data)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cached payload has unexpected shape");
                None
            }
        }
    }

    /// Store `data` with the policy TTL for `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        self.save_with_ttl(key, data, None);
    }

    pub fn save_with_ttl<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.policy.ttl_for(key));
        let entry = CacheEntry::new(
            data,
            self.clock.now_millis(),
            u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        );

        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&Self::storage_key(key), &contents) {
            warn!(key = key, error = %e, "Cache write error");
            if e.is_quota_exceeded() {
                // Make room for the next write; this one is dropped
                self.clear_expired();
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        debug!(key = key, "Invalidating cache entry");
        self.absorb("remove", key, self.storage.remove_item(&Self::storage_key(key)));
    }

    /// Remove every entry whose key starts with `prefix`. Returns how many were removed.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let full_prefix = Self::storage_key(prefix);
        self.remove_matching("invalidate_prefix", |storage_key| {
            storage_key.starts_with(&full_prefix)
        })
    }

    /// Remove expired and unreadable entries. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let removed = self.remove_matching("clear_expired", |storage_key| {
            match self.storage.get_item(storage_key) {
                Ok(Some(raw)) => match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                    Ok(entry) => entry.is_expired(now),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!(key = storage_key, error = %e, "Cache read error during sweep");
                    false
                }
            }
        });
        if removed > 0 {
            info!(removed = removed, "Cleared expired cache entries");
        }
        removed
    }

    /// Remove every cache entry regardless of TTL.
    pub fn clear_all(&self) -> usize {
        let removed = self.remove_matching("clear_all", |_| true);
        info!(removed = removed, "Cleared cache");
        removed
    }

    fn remove_matching(&self, op: &str, mut matches: impl FnMut(&str) -> bool) -> usize {
        let Some(keys) = self.absorb(op, CACHE_PREFIX, self.storage.keys()) else {
            return 0;
        };

        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|k| k.starts_with(CACHE_PREFIX) && matches(k.as_str()))
            .collect();

        doomed
            .iter()
            .filter(|k| {
                self.absorb(op, k.as_str(), self.storage.remove_item(k.as_str()))
                    .is_some()
            })
            .count()
    }

    /// Entry count, stored size, and logical keys.
    pub fn stats(&self) -> CacheStats {
        let Some(keys) = self.absorb("stats", CACHE_PREFIX, self.storage.keys()) else {
            return CacheStats::default();
        };

        let mut stats = CacheStats::default();
        for storage_key in keys {
            let Some(logical) = storage_key.strip_prefix(CACHE_PREFIX) else {
                continue;
            };
            if let Ok(Some(value)) = self.storage.get_item(&storage_key) {
                stats.total_bytes += value.len();
            }
            stats.entries += 1;
            stats.keys.push(logical.to_string());
        }
        stats
    }

    /// Read-through helper: return the cached value or run `fetch` and cache its result.
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        options: FetchOptions,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !options.force_refresh {
            if let Some(cached) = self.get(key) {
                return Ok(cached);
            }
        }

        let data = fetch().await?;
        self.save_with_ttl(key, &data, options.ttl);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::storage::{FileStorage, StorageError};
    use serde_json::json;

    fn store_with_clock() -> (CacheStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(0));
        let store = CacheStore::new(storage.clone(), CachePolicy::default()).with_clock(clock.clone());
        (store, storage, clock)
    }

    /// Storage that fails every call.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn remove_item(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn keys(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    #[test]
    fn test_announcements_ttl_boundary() {
        let (store, _, clock) = store_with_clock();
        let payload = json!([{"id": "1"}]);
        store.save("announcements", &payload);

        clock.set(299_999);
        assert_eq!(store.get::<serde_json::Value>("announcements"), Some(payload.clone()));

        clock.set(300_000);
        assert_eq!(store.get::<serde_json::Value>("announcements"), Some(payload));

        clock.set(300_001);
        assert_eq!(store.get::<serde_json::Value>("announcements"), None);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let (store, storage, clock) = store_with_clock();
        store.save("members", &vec![1, 2]);
        clock.advance(15 * 60 * 1000 + 1);

        assert_eq!(store.get::<Vec<i32>>("members"), None);
        assert_eq!(storage.get_item("portal_cache_members").unwrap(), None);
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let (store, _, _) = store_with_clock();
        store.save("newsletters", &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            store.get::<Vec<String>>("newsletters"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_explicit_ttl_overrides_policy() {
        let (store, _, clock) = store_with_clock();
        store.save_with_ttl("announcements", &1, Some(Duration::from_millis(10)));
        clock.set(11);
        assert_eq!(store.get::<i32>("announcements"), None);
    }

    #[test]
    fn test_invalidate_removes_only_target() {
        let (store, _, _) = store_with_clock();
        store.save("a", &"X");
        store.save("b", &"Y");

        store.invalidate("a");
        assert_eq!(store.get::<String>("a"), None);
        assert_eq!(store.get::<String>("b").as_deref(), Some("Y"));

        // Absent key is a no-op
        store.invalidate("a");
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let (store, _, _) = store_with_clock();
        store.save("memberActivities_1", &1);
        store.save("memberActivities_2", &2);
        store.save("members", &3);

        assert_eq!(store.invalidate_by_prefix("memberActivities"), 2);
        assert_eq!(store.get::<i32>("memberActivities_1"), None);
        assert_eq!(store.get::<i32>("memberActivities_2"), None);
        assert_eq!(store.get::<i32>("members"), Some(3));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_swept() {
        let (store, storage, _) = store_with_clock();
        storage.set_item("portal_cache_members", "{not json").unwrap();
        store.save("announcements", &1);

        assert_eq!(store.get::<serde_json::Value>("members"), None);
        assert!(storage.get_item("portal_cache_members").unwrap().is_some());

        assert_eq!(store.clear_expired(), 1);
        assert_eq!(storage.get_item("portal_cache_members").unwrap(), None);
        assert_eq!(store.get::<i32>("announcements"), Some(1));
    }

    #[test]
    fn test_wrong_shape_is_a_miss() {
        let (store, _, _) = store_with_clock();
        store.save("members", &"just a string");
        assert_eq!(store.get::<Vec<i32>>("members"), None);
    }

    #[test]
    fn test_clear_expired_keeps_fresh_and_foreign_keys() {
        let (store, storage, clock) = store_with_clock();
        storage.set_item("theme", "dark").unwrap();
        store.save("announcements", &1); // 5 min
        store.save("newsletters", &2); // 60 min

        clock.set(10 * 60 * 1000);
        assert_eq!(store.clear_expired(), 1);
        assert_eq!(store.get::<i32>("newsletters"), Some(2));
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_clear_all_leaves_foreign_keys() {
        let (store, storage, _) = store_with_clock();
        storage.set_item("theme", "dark").unwrap();
        store.save("a", &1);
        store.save("b", &2);

        assert_eq!(store.clear_all(), 2);
        assert_eq!(store.stats().entries, 0);
        assert_eq!(storage.keys().unwrap(), vec!["theme".to_string()]);
    }

    #[test]
    fn test_quota_failure_sweeps_expired_and_drops_write() {
        let storage = Arc::new(MemoryStorage::new().with_quota(60));
        let clock = Arc::new(ManualClock::new(0));
        let store = CacheStore::new(storage.clone(), CachePolicy::default()).with_clock(clock.clone());

        store.save_with_ttl("old", &1, Some(Duration::from_millis(5)));
        clock.set(100);
        store.save("big", &"x".repeat(80));

        // The expired entry was swept, the oversized write was not retried
        assert_eq!(storage.get_item("portal_cache_old").unwrap(), None);
        assert_eq!(store.get::<String>("big"), None);
    }

    #[test]
    fn test_unavailable_storage_degrades_to_miss() {
        let store = CacheStore::new(Arc::new(BrokenStorage), CachePolicy::default());
        store.save("members", &1);
        assert_eq!(store.get::<i32>("members"), None);
        store.invalidate("members");
        assert_eq!(store.invalidate_by_prefix("m"), 0);
        assert_eq!(store.clear_expired(), 0);
        assert_eq!(store.clear_all(), 0);
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[test]
    fn test_stats() {
        let (store, storage, _) = store_with_clock();
        storage.set_item("theme", "dark").unwrap();
        store.save("members", &1);
        store.save("memberActivities_7", &2);

        let stats = store.stats();
        assert_eq!(stats.entries, 2);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.keys, vec!["memberActivities_7".to_string(), "members".to_string()]);
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
            let store = CacheStore::new(storage, CachePolicy::default());
            store.save("officials", &json!([{"id": "o1"}]));
        }
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        let store = CacheStore::new(storage, CachePolicy::default());
        assert_eq!(store.get::<serde_json::Value>("officials"), Some(json!([{"id": "o1"}])));
    }

    #[tokio::test]
    async fn test_with_cache_fetches_once() {
        let (store, _, _) = store_with_clock();
        let mut calls = 0;

        let first: Result<Vec<i32>, String> = store
            .with_cache("members", FetchOptions::default(), || {
                calls += 1;
                async { Ok(vec![1]) }
            })
            .await;
        assert_eq!(first, Ok(vec![1]));

        let second: Result<Vec<i32>, String> = store
            .with_cache("members", FetchOptions::default(), || async {
                Err("should not be called".to_string())
            })
            .await;
        assert_eq!(second, Ok(vec![1]));
        assert_eq!(calls, 1);

        let forced: Result<Vec<i32>, String> = store
            .with_cache("members", FetchOptions::refresh(), || async { Ok(vec![2]) })
            .await;
        assert_eq!(forced, Ok(vec![2]));
        assert_eq!(store.get::<Vec<i32>>("members"), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_with_cache_error_is_not_cached() {
        let (store, _, _) = store_with_clock();
        let result: Result<i32, String> = store
            .with_cache("members", FetchOptions::default(), || async { Err("boom".to_string()) })
            .await;
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(store.stats().entries, 0);
    }
}
