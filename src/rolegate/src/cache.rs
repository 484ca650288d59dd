//! Per-principal resolution cache with TTL expiry
//!
//! Entries expire lazily: an expired entry is removed by the read that
//! finds it, there is no background sweep. All state sits behind a single
//! `parking_lot::Mutex`; every operation is a short critical section over an
//! in-memory map, so coarse locking is sufficient.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::types::{PrincipalId, ResolutionResult};

/// A cached resolution and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ResolutionResult,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(result: ResolutionResult) -> Self {
        let expires_at = result.expires_at;
        Self { result, expires_at }
    }

    /// Expired strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held (expired ones included until read)
    pub size: usize,
    /// Cached principals, sorted
    pub principal_ids: Vec<PrincipalId>,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<PrincipalId, CacheEntry>,
    hits: u64,
    misses: u64,
    expirations: u64,
}

/// Thread-safe resolution cache keyed by principal
///
/// Each entry expires at its result's `expires_at`, so the TTL policy lives
/// with whoever builds the results.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    state: Mutex<CacheState>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an unexpired entry, evicting it if it has expired
    pub fn get(&self, principal_id: PrincipalId, now: DateTime<Utc>) -> Option<ResolutionResult> {
        let mut state = self.state.lock();

        let expired = match state.entries.get(&principal_id) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            state.entries.remove(&principal_id);
            state.expirations += 1;
            state.misses += 1;
            return None;
        }

        state.hits += 1;
        state.entries.get(&principal_id).map(|entry| entry.result.clone())
    }

    /// Store a fresh result, replacing any previous entry
    pub fn insert(&self, result: ResolutionResult) {
        let principal_id = result.principal_id;
        self.state.lock().entries.insert(principal_id, CacheEntry::new(result));
    }

    /// Drop a principal's entry; returns whether one existed
    pub fn invalidate(&self, principal_id: PrincipalId) -> bool {
        self.state.lock().entries.remove(&principal_id).is_some()
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    /// Explicitly remove expired entries
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - state.entries.len();
        state.expirations += removed as u64;
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut principal_ids: Vec<PrincipalId> = state.entries.keys().copied().collect();
        principal_ids.sort();

        CacheStats {
            size: state.entries.len(),
            principal_ids,
            hits: state.hits,
            misses: state.misses,
            expirations: state.expirations,
        }
    }
}
