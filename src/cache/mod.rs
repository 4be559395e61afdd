//! Parsed-resource cache validated against file modification times.
//!
//! Entries are immutable and shared through `Arc`; invalidation swaps the
//! whole entry out of the map rather than mutating it, so a reader holding
//! an entry never observes a half-updated value.

mod stamp;

pub use stamp::FileStamp;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Allowed difference between a stored and a current modification time.
    pub mtime_tolerance: Duration,
    /// Oldest-built entries are evicted past this bound. `None` keeps everything.
    pub max_entries: Option<usize>,
}

/// What a loader hands back: the value plus every file it was built from.
#[derive(Debug)]
pub struct Loaded<V> {
    pub value: V,
    pub dependencies: Vec<FileStamp>,
}

impl<V> Loaded<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, stamp: FileStamp) -> Self {
        self.dependencies.push(stamp);
        self
    }

    pub fn with_dependencies(mut self, stamps: impl IntoIterator<Item = FileStamp>) -> Self {
        self.dependencies.extend(stamps);
        self
    }

    /// Stamp `path` now and record it as a dependency.
    pub fn track(self, fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        Ok(self.with_dependency(FileStamp::capture(fs, path)?))
    }
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    key: String,
    value: Arc<V>,
    dependencies: Vec<FileStamp>,
    built_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    pub fn dependencies(&self) -> &[FileStamp] {
        &self.dependencies
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }
}

#[derive(Debug, Default)]
struct MetricsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    stamp_validations: AtomicU64,
    evictions: AtomicU64,
    loads: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub stamp_validations: u64,
    pub evictions: u64,
    pub loads: u64,
}

pub struct DependencyCache<V> {
    fs: Arc<dyn FileSystem>,
    config: CacheConfig,
    entries: RwLock<HashMap<String, Arc<CacheEntry<V>>>>,
    metrics: MetricsCounters,
}

impl<V> std::fmt::Debug for DependencyCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyCache")
            .field("config", &self.config)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl<V> Default for DependencyCache<V> {
    fn default() -> Self {
        Self::new(Arc::new(OsFileSystem), CacheConfig::default())
    }
}

impl<V> DependencyCache<V> {
    pub fn new(fs: Arc<dyn FileSystem>, config: CacheConfig) -> Self {
        Self {
            fs,
            config,
            entries: RwLock::new(HashMap::new()),
            metrics: MetricsCounters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key` if every dependency is unchanged,
    /// otherwise run `loader` and cache its result.
    ///
    /// Concurrent callers that find the same stale entry may each run the
    /// loader; the last insert wins. Loader errors are returned and nothing
    /// is cached.
    pub fn get_or_load<F>(&self, key: &str, loader: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<Loaded<V>>,
    {
        // Locking strategy:
        // - Never hold the map lock during stat calls or while the loader runs.
        // - Read lock for lookups, write lock only for insert/evict.
        let cached = self.entries.read().get(key).cloned();

        if let Some(entry) = cached {
            if self.is_valid(&entry) {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("cache hit for '{key}'");
                return Ok(Arc::clone(&entry.value));
            }
            self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache entry '{key}' is stale; reloading");
            let mut entries = self.entries.write();
            if entries
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &entry))
            {
                entries.remove(key);
            }
        } else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache miss for '{key}'");
        }

        let loaded = loader()?;
        self.metrics.loads.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(CacheEntry {
            key: key.to_string(),
            value: Arc::new(loaded.value),
            dependencies: loaded.dependencies,
            built_at: Instant::now(),
        });
        let value = Arc::clone(&entry.value);

        let mut entries = self.entries.write();
        entries.insert(key.to_string(), entry);
        self.evict_if_needed(&mut entries);
        Ok(value)
    }

    /// The current entry for `key`, without validating it.
    pub fn entry(&self, key: &str) -> Option<Arc<CacheEntry<V>>> {
        self.entries.read().get(key).cloned()
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            invalidations: self.metrics.invalidations.load(Ordering::Relaxed),
            stamp_validations: self.metrics.stamp_validations.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
            loads: self.metrics.loads.load(Ordering::Relaxed),
        }
    }

    fn is_valid(&self, entry: &CacheEntry<V>) -> bool {
        entry.dependencies.iter().all(|stamp| {
            self.metrics.stamp_validations.fetch_add(1, Ordering::Relaxed);
            let current = stamp.is_current(self.fs.as_ref(), self.config.mtime_tolerance);
            if !current {
                log::trace!("dependency {} of '{}' changed", stamp.path.display(), entry.key);
            }
            current
        })
    }

    fn evict_if_needed(&self, entries: &mut HashMap<String, Arc<CacheEntry<V>>>) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };
        while entries.len() > max_entries.max(1) {
            let oldest = entries
                .values()
                .min_by_key(|entry| entry.built_at)
                .map(|entry| entry.key.clone());
            let Some(key) = oldest else {
                return;
            };
            entries.remove(&key);
            self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
            log::trace!("evicted '{key}' (cache bound {max_entries})");
        }
    }
}
