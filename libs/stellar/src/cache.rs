//! Bounded cache of parsed expressions keyed by exact source text.
//!
//! Hits only touch a `DashMap` shard read lock and an atomic tick, so
//! concurrent lookups do not serialize. Misses are single-flight: the first
//! caller for a source compiles it while later callers for the same source
//! wait on the same [`OnceLock`] and share its result. Compile failures are
//! shared with those waiters but never stored.
//!
//! Eviction is approximate LRU: when the cache grows past capacity the entry
//! with the oldest access tick is removed.

use crate::ast::ParsedExpression;
use crate::error::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

type Slot = Arc<OnceLock<Result<Arc<ParsedExpression>>>>;

struct CacheEntry {
    expr: Arc<ParsedExpression>,
    last_access: AtomicU64,
}

/// Counters since creation (or the last [`ExpressionCache::clear`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls of the compile function; equals misses minus joined waiters
    pub compiles: u64,
    pub evictions: u64,
}

pub struct ExpressionCache {
    capacity: usize,
    entries: DashMap<Arc<str>, CacheEntry>,
    in_flight: Mutex<HashMap<Arc<str>, Slot>>,
    evict_lock: Mutex<()>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    evictions: AtomicU64,
}

impl ExpressionCache {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "expression cache capacity must be at least 1".into(),
            ));
        }
        Ok(Self::with_capacity(capacity))
    }

    /// Like [`new`](Self::new) with `capacity` raised to at least 1
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: DashMap::with_capacity(capacity),
            in_flight: Mutex::new(HashMap::new()),
            evict_lock: Mutex::new(()),
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached expression for `source`, compiling it at most once
    /// across concurrent callers on a miss.
    pub fn get_or_compile<F>(&self, source: &str, compile: F) -> Result<Arc<ParsedExpression>>
    where
        F: FnOnce(&str) -> Result<ParsedExpression>,
    {
        if let Some(expr) = self.lookup(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(expr);
        }

        let (slot, leader) = {
            let mut in_flight = self.in_flight.lock();
            // An in-flight compile may have finished between lookup and lock.
            if let Some(expr) = self.lookup(source) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(expr);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            match in_flight.get(source) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot: Slot = Arc::new(OnceLock::new());
                    in_flight.insert(Arc::from(source), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        let result = slot
            .get_or_init(|| {
                self.compiles.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(source, "Compiling expression");
                compile(source).map(Arc::new)
            })
            .clone();

        if leader {
            if let Ok(expr) = &result {
                self.insert(source, Arc::clone(expr));
            }
            let mut in_flight = self.in_flight.lock();
            if in_flight
                .get(source)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                in_flight.remove(source);
            }
        }
        result
    }

    /// Cached expression for `source`, without compiling.
    pub fn get(&self, source: &str) -> Option<Arc<ParsedExpression>> {
        self.lookup(source)
    }

    fn lookup(&self, source: &str) -> Option<Arc<ParsedExpression>> {
        let entry = self.entries.get(source)?;
        entry.last_access.store(self.next_tick(), Ordering::Relaxed);
        Some(Arc::clone(&entry.expr))
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    fn insert(&self, source: &str, expr: Arc<ParsedExpression>) {
        self.entries.insert(
            Arc::from(source),
            CacheEntry {
                expr,
                last_access: AtomicU64::new(self.next_tick()),
            },
        );
        if self.entries.len() > self.capacity {
            self.evict();
        }
    }

    fn evict(&self) {
        let _guard = self.evict_lock.lock();
        while self.entries.len() > self.capacity {
            // Pick the victim first; removing while iterating would deadlock
            // on the shard lock.
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.last_access.load(Ordering::Relaxed))
                .map(|entry| Arc::clone(entry.key()));
            let Some(victim) = victim else { break };
            if self.entries.remove(&victim).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(source = %victim, "Evicted cached expression");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and reset the counters. Compiles already in flight
    /// still complete and are inserted.
    pub fn clear(&self) {
        self.entries.clear();
        for counter in [&self.hits, &self.misses, &self.compiles, &self.evictions] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(ExpressionCache::new(0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ExpressionCache::new(2).unwrap();
        cache.get_or_compile("1", parse).unwrap();
        cache.get_or_compile("2", parse).unwrap();
        // Touch "1" so "2" becomes the oldest.
        cache.get_or_compile("1", parse).unwrap();
        cache.get_or_compile("3", parse).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("1").is_some());
        assert!(cache.get("2").is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ExpressionCache::new(4).unwrap();
        assert!(cache.get_or_compile("1 +", parse).is_err());
        assert!(cache.get_or_compile("1 +", parse).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().compiles, 2);
    }
}
