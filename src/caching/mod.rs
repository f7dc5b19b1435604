//! # Caching Module
//!
//! Memoization wrappers for objective functions. Simulating a spectrum is
//! expensive and a GA revisits the same points (elites are carried over,
//! mutation may leave a vector unchanged after clamping), so remembering
//! scores saves real work.
//!
//! Keys are the exact bit patterns of the parameter vector. Only successful
//! evaluations are cached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::objective::ObjectiveFunction;

/// Exact key of a parameter vector.
pub type CacheKey = Vec<u64>;

/// Builds the cache key of `values`.
pub fn cache_key(values: &[f64]) -> CacheKey {
    values.iter().map(|v| v.to_bits()).collect()
}

/// An objective wrapper sharing one cache between all threads.
#[derive(Debug, Clone)]
pub struct CachedObjective<O> {
    objective: O,
    cache: Arc<Mutex<HashMap<CacheKey, f64>>>,
}

impl<O: ObjectiveFunction> CachedObjective<O> {
    pub fn new(objective: O) -> Self {
        Self {
            objective,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a cached objective with a pre-populated cache.
    pub fn with_cache(objective: O, cache: HashMap<CacheKey, f64>) -> Self {
        Self {
            objective,
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn inner(&self) -> &O {
        &self.objective
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Returns a copy of the cache.
    pub fn get_cache(&self) -> HashMap<CacheKey, f64> {
        self.cache.lock().clone()
    }
}

impl<O: ObjectiveFunction> ObjectiveFunction for CachedObjective<O> {
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        let key = cache_key(values);
        if let Some(score) = self.cache.lock().get(&key) {
            return Ok(*score);
        }

        // The lock is not held while the objective runs.
        let score = self.objective.evaluate(values)?;
        self.cache.lock().insert(key, score);
        Ok(score)
    }
}

/// A per-thread cache of scores.
#[derive(Debug, Default)]
pub struct ThreadLocalCache {
    cache: thread_local::ThreadLocal<RefCell<HashMap<CacheKey, f64>>>,
}

impl ThreadLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        self.cache
            .get()
            .and_then(|cell| cell.try_borrow().ok())
            .and_then(|cache| cache.get(key).copied())
    }

    pub fn insert(&self, key: CacheKey, value: f64) {
        let cell = self.cache.get_or(|| RefCell::new(HashMap::new()));
        if let Ok(mut cache) = cell.try_borrow_mut() {
            cache.insert(key, value);
        }
    }

    /// Clears the cache of the current thread.
    pub fn clear(&self) {
        if let Some(cell) = self.cache.get() {
            if let Ok(mut cache) = cell.try_borrow_mut() {
                cache.clear();
            }
        }
    }

    /// Number of scores cached by the current thread.
    pub fn len(&self) -> usize {
        self.cache
            .get()
            .and_then(|cell| cell.try_borrow().ok())
            .map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An objective wrapper where every thread keeps its own cache.
///
/// Useful with parallel evaluation, where a shared map would be contended.
#[derive(Debug, Clone)]
pub struct ThreadLocalCachedObjective<O> {
    objective: O,
    cache: Arc<ThreadLocalCache>,
}

impl<O: ObjectiveFunction> ThreadLocalCachedObjective<O> {
    pub fn new(objective: O) -> Self {
        Self {
            objective,
            cache: Arc::new(ThreadLocalCache::new()),
        }
    }

    pub fn inner(&self) -> &O {
        &self.objective
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

impl<O: ObjectiveFunction> ObjectiveFunction for ThreadLocalCachedObjective<O> {
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        let key = cache_key(values);
        if let Some(score) = self.cache.get(&key) {
            return Ok(score);
        }
        let score = self.objective.evaluate(values)?;
        self.cache.insert(key, score);
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimizationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default)]
    struct CountingObjective {
        evaluations: Arc<AtomicUsize>,
    }

    impl CountingObjective {
        fn evaluations(&self) -> usize {
            self.evaluations.load(Ordering::SeqCst)
        }
    }

    impl ObjectiveFunction for CountingObjective {
        fn evaluate(&self, values: &[f64]) -> Result<f64> {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            if values[0] < 0.0 {
                return Err(OptimizationError::Evaluation("negative".to_string()));
            }
            Ok((values[0] - 50.0).abs())
        }
    }

    #[test]
    fn test_cached_objective() {
        let objective = CountingObjective::default();
        let cached = CachedObjective::new(objective.clone());

        let first = cached.evaluate(&[10.0]).unwrap();
        assert_eq!(objective.evaluations(), 1);
        let second = cached.evaluate(&[10.0]).unwrap();
        assert_eq!(objective.evaluations(), 1);
        assert_eq!(first, second);

        cached.evaluate(&[20.0]).unwrap();
        assert_eq!(objective.evaluations(), 2);
        assert_eq!(cached.cache_size(), 2);

        cached.clear_cache();
        assert_eq!(cached.cache_size(), 0);
        cached.evaluate(&[10.0]).unwrap();
        assert_eq!(objective.evaluations(), 3);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let objective = CountingObjective::default();
        let cached = CachedObjective::new(objective.clone());
        assert!(cached.evaluate(&[-1.0]).is_err());
        assert!(cached.evaluate(&[-1.0]).is_err());
        assert_eq!(objective.evaluations(), 2);
        assert_eq!(cached.cache_size(), 0);
    }

    #[test]
    fn test_thread_local_cached_objective() {
        let objective = CountingObjective::default();
        let cached = ThreadLocalCachedObjective::new(objective.clone());

        cached.evaluate(&[10.0]).unwrap();
        cached.evaluate(&[10.0]).unwrap();
        assert_eq!(objective.evaluations(), 1);
        cached.evaluate(&[20.0]).unwrap();
        assert_eq!(cached.cache_size(), 2);

        cached.clear_cache();
        assert_eq!(cached.cache_size(), 0);
    }

    #[test]
    fn test_with_cache() {
        let objective = CountingObjective::default();
        let mut cache = HashMap::new();
        cache.insert(cache_key(&[10.0]), 0.5);
        let cached = CachedObjective::with_cache(objective.clone(), cache);

        assert_eq!(cached.evaluate(&[10.0]).unwrap(), 0.5);
        assert_eq!(objective.evaluations(), 0);
        assert_eq!(cached.get_cache().len(), 1);
    }
}
