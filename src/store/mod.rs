pub mod entry;

use crate::expiry::TimeWheel;
use crate::glob::glob_match;
use crate::types::RedisValue;
use entry::{Entry, now_millis};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single Redis database (one of the 16 default databases).
#[derive(Debug)]
pub struct Database {
    data: HashMap<String, Entry>,
    /// Monotonically increasing version counter for WATCH support.
    key_versions: HashMap<String, u64>,
    version_seq: u64,
    /// Count of keys lazily expired since last drain.
    pub lazy_expired_count: u64,
    /// Count of keys expired by the time-wheel's proactive fire, since last drain.
    pub wheel_expired_count: u64,
    /// Proactive deadline tracker; populated whenever an expiry is set.
    wheel: TimeWheel,
    /// Fraction of sampled keys found expired on the last active-expire cycle,
    /// used to escalate next cycle's sampling effort.
    active_expire_ratio: f64,
}

impl Database {
    pub fn new() -> Self {
        Database {
            data: HashMap::new(),
            key_versions: HashMap::new(),
            version_seq: 0,
            lazy_expired_count: 0,
            wheel_expired_count: 0,
            wheel: TimeWheel::with_defaults(),
            active_expire_ratio: 0.0,
        }
    }

    /// The sampling effort the next active-expire cycle should use, escalating
    /// when the last cycle found a large fraction of sampled keys expired.
    pub fn next_active_expire_effort(&self) -> usize {
        if self.active_expire_ratio > 0.25 {
            100
        } else if self.active_expire_ratio > 0.10 {
            40
        } else {
            20
        }
    }

    /// Bump the version of a key (called after writes for WATCH support).
    pub fn touch(&mut self, key: &str) {
        self.version_seq += 1;
        self.key_versions.insert(key.to_string(), self.version_seq);
    }

    /// Bump the global version (for FLUSHDB/FLUSHALL).
    pub fn touch_all(&mut self) {
        self.version_seq += 1;
        // Clear specific versions; any WATCH check will see version mismatch
        // since we increment version_seq past any stored version.
        self.key_versions.clear();
    }

    /// Get the current version of a key (0 if never written).
    pub fn key_version(&self, key: &str) -> u64 {
        self.key_versions.get(key).copied().unwrap_or(0)
    }

    /// Get the global version sequence (for touch_all detection).
    pub fn global_version(&self) -> u64 {
        self.version_seq
    }

    /// Check whether a key exists and is not expired, without mutating
    /// lazy-expiry bookkeeping. Used by WATCH to snapshot liveness.
    pub fn key_alive(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Get a value, performing lazy expiration and recording the access for
    /// the LRU/LFU eviction policies.
    pub fn get(&mut self, key: &str) -> Option<&Entry> {
        // Lazy expiration
        if self.is_expired(key) {
            self.data.remove(key);
            self.lazy_expired_count += 1;
            return None;
        }
        let entry = self.data.get_mut(key)?;
        entry.touch_access();
        self.data.get(key)
    }

    /// Get a mutable value, performing lazy expiration and recording access.
    /// Every caller of `get_mut` intends to write through it, so this also
    /// bumps the key's WATCH version.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        if self.is_expired(key) {
            self.data.remove(key);
            self.lazy_expired_count += 1;
            return None;
        }
        if !self.data.contains_key(key) {
            return None;
        }
        self.touch(key);
        let entry = self.data.get_mut(key)?;
        entry.touch_access();
        Some(entry)
    }

    /// Set a key-value pair, arming the time wheel if the entry carries an expiry.
    pub fn set(&mut self, key: String, entry: Entry) {
        if let Some(deadline) = entry.expires_at {
            self.wheel.add(now_millis(), key.clone(), deadline);
        }
        self.touch(&key);
        self.data.insert(key, entry);
    }

    /// Delete a key. Returns true if it existed.
    pub fn del(&mut self, key: &str) -> bool {
        let existed = self.data.remove(key).is_some();
        if existed {
            self.touch(key);
        }
        existed
    }

    /// Check if a key exists (with lazy expiration).
    pub fn exists(&mut self, key: &str) -> bool {
        if self.is_expired(key) {
            self.data.remove(key);
            self.lazy_expired_count += 1;
            return false;
        }
        self.data.contains_key(key)
    }

    /// Get the type of a key.
    pub fn key_type(&mut self, key: &str) -> Option<&'static str> {
        self.get(key).map(|e| e.value.type_name())
    }

    /// Rename a key.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if let Some(entry) = self.data.remove(old) {
            self.data.insert(new.to_string(), entry);
            self.touch(old);
            self.touch(new);
            true
        } else {
            false
        }
    }

    /// Get all keys matching a pattern.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let now = now_millis();
        self.data
            .iter()
            .filter(|(_, entry)| {
                !entry.expires_at.is_some_and(|exp| now >= exp)
            })
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Scan with cursor-based iteration.
    /// Returns (next_cursor, keys).
    pub fn scan(&mut self, cursor: usize, pattern: Option<&str>, count: usize) -> (usize, Vec<String>) {
        self.scan_with_type(cursor, pattern, count, None)
    }

    /// Scan with cursor-based iteration and optional type filter.
    /// Lazily expires keys that match the pattern and are expired.
    pub fn scan_with_type(&mut self, cursor: usize, pattern: Option<&str>, count: usize, type_filter: Option<&str>) -> (usize, Vec<String>) {
        let now = now_millis();

        // Lazily delete expired keys that match the scan pattern
        // Do this BEFORE building the cursor list for stability
        {
            let expired_matches: Vec<String> = self.data.iter()
                .filter(|(key, entry)| {
                    entry.expires_at.is_some_and(|exp| now >= exp)
                        && pattern.map_or(true, |pat| glob_match(pat, key))
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired_matches {
                self.data.remove(&key);
            }
        }

        // Build sorted key list from non-expired keys for deterministic cursor
        let mut all_keys: Vec<&String> = self
            .data
            .iter()
            .filter(|(_, entry)| {
                !entry.expires_at.is_some_and(|exp| now >= exp)
            })
            .map(|(key, _)| key)
            .collect();
        all_keys.sort();

        let total = all_keys.len();
        if total == 0 || cursor >= total {
            return (0, vec![]);
        }

        let mut results = Vec::new();
        let mut i = cursor;
        let mut scanned = 0;

        while i < total && scanned < count {
            let key = all_keys[i];
            let matches_pattern = pattern.map_or(true, |p| glob_match(p, key));
            let matches_type = type_filter.map_or(true, |t| {
                self.data.get(key).map_or(false, |entry| entry.value.type_name().eq_ignore_ascii_case(t))
            });
            if matches_pattern && matches_type {
                results.push(key.clone());
            }
            i += 1;
            scanned += 1;
        }

        let next_cursor = if i >= total { 0 } else { i };
        (next_cursor, results)
    }

    /// Get the expiry timestamp of a key, if any.
    pub fn get_expiry(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(|e| e.expires_at)
    }

    /// Set expiry on a key. Returns true if the key exists.
    pub fn set_expiry(&mut self, key: &str, expires_at: u64) -> bool {
        if let Some(entry) = self.data.get_mut(key) {
            entry.expires_at = Some(expires_at);
            self.wheel.add(now_millis(), key.to_string(), expires_at);
            self.touch(key);
            true
        } else {
            false
        }
    }

    /// Remove expiry from a key. Returns true if the key had an expiry.
    pub fn persist(&mut self, key: &str) -> bool {
        if let Some(entry) = self.data.get_mut(key)
            && entry.expires_at.is_some()
        {
            entry.expires_at = None;
            self.touch(key);
            return true;
        }
        false
    }

    /// Number of keys in the database (includes expired keys not yet removed).
    pub fn dbsize(&self) -> usize {
        self.data.len()
    }

    /// Flush all data.
    pub fn flush(&mut self) {
        self.data.clear();
        self.touch_all();
    }

    /// Run active expiration: sample up to `effort` random expiring keys and
    /// remove those past their deadline. Returns (removed, sampled) so the
    /// caller can decide whether to escalate the effort on the next cycle.
    pub fn active_expire(&mut self, effort: usize) -> (usize, usize) {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        let now = now_millis();
        let sample: Vec<String> = self
            .data
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some())
            .map(|(key, _)| key.clone())
            .choose_multiple(&mut rng, effort);
        let sampled = sample.len();

        let expired: Vec<String> = sample
            .into_iter()
            .filter(|key| {
                self.data
                    .get(key)
                    .and_then(|e| e.expires_at)
                    .is_some_and(|exp| now >= exp)
            })
            .collect();
        let removed = expired.len();
        for key in expired {
            self.data.remove(&key);
        }
        self.active_expire_ratio = if sampled > 0 {
            removed as f64 / sampled as f64
        } else {
            0.0
        };
        (removed, sampled)
    }

    /// Advance the time wheel by one tick and delete any fired key whose
    /// live deadline has actually passed. Entries whose deadline was pushed
    /// out after being scheduled (a later SETEX re-arming them) are
    /// discarded without being deleted — they already have a fresh wheel
    /// entry at the new deadline. Returns the number of keys removed.
    pub fn wheel_tick(&mut self) -> usize {
        let now = now_millis();
        let fired = self.wheel.advance(now);
        let mut removed = 0;
        for entry in fired {
            if self
                .data
                .get(&entry.key)
                .and_then(|e| e.expires_at)
                .is_some_and(|deadline| deadline <= now)
            {
                self.data.remove(&entry.key);
                removed += 1;
            }
        }
        self.wheel_expired_count += removed as u64;
        removed
    }

    /// Get a random key.
    pub fn random_key(&self) -> Option<String> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        let now = now_millis();
        self.data
            .iter()
            .filter(|(_, entry)| {
                !entry.expires_at.is_some_and(|exp| now >= exp)
            })
            .map(|(key, _)| key.clone())
            .choose(&mut rng)
    }

    /// Get a random key that carries an expiry, used by the active sampler.
    pub fn random_expiring_key(&self) -> Option<String> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        let now = now_millis();
        self.data
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some_and(|exp| exp > now))
            .map(|(key, _)| key.clone())
            .choose(&mut rng)
    }

    /// Get an entry without lazy expiration (for read-only inspection like MEMORY USAGE).
    pub fn get_entry(&self, key: &str) -> Option<&Entry> {
        let entry = self.data.get(key)?;
        if entry.is_expired() {
            None
        } else {
            Some(entry)
        }
    }

    fn is_expired(&self, key: &str) -> bool {
        self.data
            .get(key)
            .is_some_and(|entry| entry.is_expired())
    }

    /// Get keys with expiry info for persistence
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.data.iter()
    }

    /// Number of keys with expiry set
    pub fn expires_count(&self) -> usize {
        self.data
            .values()
            .filter(|e| e.expires_at.is_some())
            .count()
    }

    /// Estimate memory usage of this database in bytes.
    pub fn estimated_memory(&self) -> usize {
        let mut total = 0usize;
        for (key, entry) in &self.data {
            // Key string bytes + entry overhead (struct + Option<u64>)
            total += key.len() + 48;
            total += value_size_estimate(&entry.value);
        }
        total
    }

    /// Sample up to `n` keys for the eviction candidate pool, returning each
    /// key's bookkeeping needed to score it. `volatile_only` restricts the
    /// sample to keys carrying an expiry, as required by `volatile-*` policies.
    pub fn sample_for_eviction(&self, n: usize, volatile_only: bool) -> Vec<EvictionSample> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        self.data
            .iter()
            .filter(|(_, e)| !volatile_only || e.expires_at.is_some())
            .choose_multiple(&mut rng, n)
            .into_iter()
            .map(|(key, entry)| EvictionSample {
                key: key.clone(),
                idle_seconds: entry.idle_seconds(),
                lfu_score: entry.lfu_score(),
                expires_at: entry.expires_at,
            })
            .collect()
    }

    /// Remove a key for eviction, returning an estimate of bytes freed
    /// (floored at 64 so tiny values still make progress).
    pub fn evict_key(&mut self, key: &str) -> usize {
        let size = self
            .data
            .get(key)
            .map(|e| key.len() + 48 + value_size_estimate(&e.value))
            .unwrap_or(0);
        self.data.remove(key);
        size.max(64)
    }
}

/// A sampled key's bookkeeping, used by the eviction candidate pool to score it.
#[derive(Debug, Clone)]
pub struct EvictionSample {
    pub key: String,
    pub idle_seconds: u64,
    pub lfu_score: u8,
    pub expires_at: Option<u64>,
}

fn value_size_estimate(value: &RedisValue) -> usize {
    match value {
        RedisValue::String(s) => s.len(),
        RedisValue::List(l) => {
            let element_bytes: usize = l.iter().map(|v| v.len()).sum();
            64 * l.len() + element_bytes
        }
        RedisValue::Hash(h) => {
            let field_bytes: usize = h.iter().map(|(k, v)| k.len() + v.len()).sum();
            96 * h.len() + field_bytes
        }
        RedisValue::Set(s) => {
            let member_bytes: usize = s.iter().map(|m| m.len()).sum();
            64 * s.len() + member_bytes
        }
        RedisValue::SortedSet(z) => {
            let member_bytes: usize = z.iter().map(|(m, _)| m.len()).sum();
            96 * z.len() + member_bytes
        }
        RedisValue::Stream(s) => 128 * s.len(),
    }
}

/// The complete data store â€” holds multiple databases.
#[derive(Debug)]
pub struct DataStore {
    pub databases: Vec<Database>,
    /// Tracks changes since last RDB save for INFO rdb_changes_since_last_save.
    pub dirty: u64,
    /// Total number of keys expired (lazy + active).
    pub expired_keys: u64,
    /// Number of keys expired by the active expiration background task.
    pub expired_keys_active: u64,
}

impl DataStore {
    pub fn new(num_databases: usize) -> Self {
        let mut databases = Vec::with_capacity(num_databases);
        for _ in 0..num_databases {
            databases.push(Database::new());
        }
        DataStore { databases, dirty: 0, expired_keys: 0, expired_keys_active: 0 }
    }

    pub fn db(&mut self, index: usize) -> &mut Database {
        &mut self.databases[index]
    }

    pub fn flush_all(&mut self) {
        for db in &mut self.databases {
            db.flush();
        }
    }

    pub fn swap_db(&mut self, a: usize, b: usize) -> bool {
        if a >= self.databases.len() || b >= self.databases.len() {
            return false;
        }
        self.databases.swap(a, b);
        true
    }

    /// Run active expiration across all databases, escalating each
    /// database's sampling effort when the prior cycle found many expired
    /// keys.
    pub fn active_expire_cycle(&mut self) -> usize {
        let mut total = 0;
        for db in &mut self.databases {
            let effort = db.next_active_expire_effort();
            let (removed, _sampled) = db.active_expire(effort);
            total += removed;
        }
        self.expired_keys += total as u64;
        self.expired_keys_active += total as u64;
        // Also drain any lazy-expired counts from databases
        for db in &mut self.databases {
            let lazy = db.lazy_expired_count;
            self.expired_keys += lazy;
            db.lazy_expired_count = 0;
        }
        total
    }

    /// Advance the time wheel by one tick across all databases, deleting any
    /// keys whose deadline has genuinely passed. Intended to run on a fast
    /// (10ms) ticker, separate from the coarser active-expire sweep.
    pub fn wheel_tick_cycle(&mut self) -> usize {
        let mut total = 0;
        for db in &mut self.databases {
            total += db.wheel_tick();
        }
        self.expired_keys += total as u64;
        total
    }

    /// Drain lazy expired counts from all databases into the store-level counter.
    pub fn drain_lazy_expired(&mut self) {
        for db in &mut self.databases {
            let lazy = db.lazy_expired_count;
            self.expired_keys += lazy;
            db.lazy_expired_count = 0;
        }
    }

    /// Estimate total memory usage across all databases.
    pub fn estimated_memory(&self) -> usize {
        self.databases.iter().map(|db| db.estimated_memory()).sum()
    }
}

pub type SharedStore = Arc<RwLock<DataStore>>;
