//! Specialization cache.
//!
//! Maps `(callable, signature, pass set)` to the callable that should run
//! for that signature. Each key owns a slot guarded by its own mutex; the
//! first caller for a key holds the slot lock while the pipeline runs, so
//! concurrent callers for the same key wait instead of running it again.
//! A failed resolution leaves the slot empty and the next call retries.

use dashmap::DashMap;
use log::debug;
use lumen_ir::{CallSignature, Callable, CallableId};
use lumen_pipeline::{PassSet, PassSetId};
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// Key and Resolution
// =============================================================================

/// Identity of one specialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecializationKey {
    pub callable: CallableId,
    pub signature: CallSignature,
    pub pass_set: PassSetId,
}

impl SpecializationKey {
    pub fn new(callable: &Callable, signature: CallSignature, pass_set: &PassSet) -> Self {
        Self {
            callable: callable.id(),
            signature,
            pass_set: pass_set.id(),
        }
    }
}

/// What a call with a given key should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A callable produced by the pipeline.
    Specialized(Callable),
    /// The pipeline found no improvement; run the original.
    Fallback(Callable),
}

impl Resolution {
    /// Callable to invoke.
    #[inline]
    pub fn callable(&self) -> &Callable {
        match self {
            Resolution::Specialized(callable) | Resolution::Fallback(callable) => callable,
        }
    }

    #[inline]
    pub fn is_specialized(&self) -> bool {
        matches!(self, Resolution::Specialized(_))
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Per-key cell. `filled` is set once the resolution is stored and never
/// cleared, so it can be read without taking the lock.
#[derive(Default)]
struct Slot {
    resolution: Mutex<Option<Resolution>>,
    filled: AtomicBool,
}

/// Concurrent specialization cache.
///
/// Resolvers must not re-enter the cache with the key they are resolving.
pub struct SpecializationCache {
    slots: DashMap<SpecializationKey, Arc<Slot>, FxBuildHasher>,
    hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
    insertions: AtomicU64,
}

impl SpecializationCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_hasher(FxBuildHasher::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        }
    }

    /// Cached resolution for `key`, or the result of `resolve`.
    ///
    /// At most one `resolve` runs per key at a time. On error nothing is
    /// cached and the error is returned.
    pub fn get_or_resolve<F, E>(&self, key: &SpecializationKey, resolve: F) -> Result<Resolution, E>
    where
        F: FnOnce() -> Result<Resolution, E>,
    {
        let slot = self.slot(key);
        let mut guard = slot.resolution.lock();

        if let Some(resolution) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(resolution.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("specialization miss for {}{} under {}", key.callable, key.signature, key.pass_set);

        let resolution = resolve()?;
        if !resolution.is_specialized() {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        self.insertions.fetch_add(1, Ordering::Relaxed);
        *guard = Some(resolution.clone());
        slot.filled.store(true, Ordering::Release);
        Ok(resolution)
    }

    /// Cached resolution for `key`.
    ///
    /// Waits for an in-flight resolution of the same key.
    pub fn lookup(&self, key: &SpecializationKey) -> Option<Resolution> {
        let slot = self.slots.get(key).map(|entry| entry.value().clone())?;
        let resolution = slot.resolution.lock().clone();
        resolution
    }

    #[inline]
    pub fn contains(&self, key: &SpecializationKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Number of cached resolutions.
    ///
    /// Slots still being resolved are not counted. A resolution that
    /// finishes after [`clear`](Self::clear) removed its slot is never
    /// counted.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().filled.load(Ordering::Acquire))
            .count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached resolution. Counters are kept.
    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
        }
    }

    /// Slot for `key`, created empty on first use.
    ///
    /// The shard guard is released before the slot is locked.
    fn slot(&self, key: &SpecializationKey) -> Arc<Slot> {
        if let Some(entry) = self.slots.get(key) {
            return entry.value().clone();
        }
        self.slots.entry(key.clone()).or_default().value().clone()
    }
}

impl Default for SpecializationCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Misses resolved to the original callable.
    pub fallbacks: u64,
    pub insertions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ir::{TypeTag, Value};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn callable(name: &str) -> Callable {
        Callable::native(name, 1, |args| Ok(args[0].clone()))
    }

    fn key(target: &Callable, ty: TypeTag, set: &PassSet) -> SpecializationKey {
        SpecializationKey::new(target, CallSignature::from_types([ty]), set)
    }

    #[test]
    fn test_resolves_once_per_key() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let spec = callable("f_int");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);

        let first: Result<_, ()> = cache.get_or_resolve(&k, || Ok(Resolution::Specialized(spec.clone())));
        let second: Result<_, ()> = cache.get_or_resolve(&k, || panic!("resolved twice"));

        assert_eq!(first.unwrap(), Resolution::Specialized(spec.clone()));
        assert_eq!(second.unwrap().callable(), &spec);
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_keys_distinguish_signature_and_pass_set() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let a = PassSet::empty();
        let b = PassSet::empty();

        for k in [
            key(&f, TypeTag::Int, &a),
            key(&f, TypeTag::Float, &a),
            key(&f, TypeTag::Int, &b),
        ] {
            let _: Result<_, ()> = cache.get_or_resolve(&k, || Ok(Resolution::Fallback(f.clone())));
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().fallbacks, 3);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);

        let err = cache.get_or_resolve(&k, || Err("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert!(!cache.contains(&k));
        assert!(cache.is_empty());

        let ok: Result<_, &str> = cache.get_or_resolve(&k, || Ok(Resolution::Fallback(f.clone())));
        assert!(ok.is_ok());
        assert_eq!(cache.lookup(&k), Some(Resolution::Fallback(f.clone())));
    }

    #[test]
    fn test_clear() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);
        let _: Result<_, ()> = cache.get_or_resolve(&k, || Ok(Resolution::Fallback(f.clone())));

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.lookup(&k).is_none());
    }

    #[test]
    fn test_clear_during_resolution_is_not_counted() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);

        let resolved: Result<_, ()> = cache.get_or_resolve(&k, || {
            cache.clear();
            Ok(Resolution::Fallback(f.clone()))
        });
        assert!(resolved.is_ok());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().entries, 0);
        assert!(cache.lookup(&k).is_none());

        let again: Result<_, ()> = cache.get_or_resolve(&k, || Ok(Resolution::Fallback(f.clone())));
        assert!(again.is_ok());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&k));
    }

    #[test]
    fn test_pending_resolution_is_not_counted() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);

        let resolved: Result<_, ()> = cache.get_or_resolve(&k, || {
            assert_eq!(cache.len(), 0);
            Ok(Resolution::Fallback(f.clone()))
        });
        assert!(resolved.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_callers_share_one_resolution() {
        let cache = SpecializationCache::new();
        let f = callable("f");
        let set = PassSet::empty();
        let k = key(&f, TypeTag::Int, &set);
        let runs = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let resolved: Result<_, ()> = cache.get_or_resolve(&k, || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(5));
                        Ok(Resolution::Specialized(callable("f_int")))
                    });
                    resolved.unwrap().callable().call(&[Value::Int(1)]).unwrap()
                });
            }
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 7);
    }
}
