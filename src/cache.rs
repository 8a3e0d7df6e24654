// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic TTL cache for computed aggregates.
//!
//! Expiry is lazy: stale records are evicted when read, never by a background
//! sweep, so memory is bounded only by the set of distinct keys used. Keys
//! are caller-constructed composite strings (e.g. user id + date).

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A cached value with its storage time.
struct CacheRecord<V> {
    value: V,
    stored_at: Instant,
}

/// Key-value cache where records expire `ttl` after being stored.
///
/// `set` always overwrites and resets the record's clock. Writers racing on
/// the same key are not serialized here; callers that need ordering must
/// serialize their own writes.
pub struct TtlCache<V> {
    records: DashMap<String, CacheRecord<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache whose records live for `ttl` after each `set`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    /// Get the value for `key` if present and fresh.
    ///
    /// A stale record is removed as a side effect of the read.
    pub fn get(&self, key: &str) -> Option<V> {
        let stale = match self.records.get(key) {
            Some(record) => {
                if record.stored_at.elapsed() <= self.ttl {
                    return Some(record.value.clone());
                }
                true
            }
            None => false,
        };

        if stale {
            self.records.remove(key);
        }
        None
    }

    /// Store a value, overwriting any existing record for `key`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.records.insert(
            key.into(),
            CacheRecord {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Whether `key` holds a fresh record. Evicts a stale one.
    pub fn has(&self, key: &str) -> bool {
        let stale = match self.records.get(key) {
            Some(record) => record.stored_at.elapsed() > self.ttl,
            None => return false,
        };

        if stale {
            self.records.remove(key);
            return false;
        }
        true
    }

    /// Remove one entry, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.records.remove(key);
            }
            None => self.records.clear(),
        }
    }

    /// Number of records currently stored (stale records included until read).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
