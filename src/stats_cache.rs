use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::collab::StatsSource;
use crate::identity::{CachedStats, PlayerId, StatKind};

const CACHE_DIR: &str = "roster_stats";
const SNAPSHOT_FILE: &str = "stats_cache.json";
const SNAPSHOT_VERSION: u32 = 1;
const HARD_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissSnapshot {
    pub cold: u64,
    pub expired: u64,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SnapshotFile {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    id: PlayerId,
    kind: StatKind,
    stats: CachedStats,
}

/// Resolved stats keyed by player and game, written by fetch completions and
/// read by the render pass.
///
/// Reads are lock-free. Writers serialise on `write_lock` so the size cap and
/// the oldest-entry eviction hold with any number of concurrent writers.
#[derive(Debug)]
pub struct StatsCache {
    entries: DashMap<(PlayerId, StatKind), CachedStats>,
    write_lock: Mutex<()>,
    max_entries: usize,
    freshness_ttl_ms: u64,
    cold_misses: AtomicU64,
    expired_misses: AtomicU64,
}

impl StatsCache {
    pub fn new(max_entries: usize, freshness_ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
            max_entries: max_entries.clamp(1, HARD_MAX_ENTRIES),
            freshness_ttl_ms,
            cold_misses: AtomicU64::new(0),
            expired_misses: AtomicU64::new(0),
        }
    }

    pub fn freshness_ttl_ms(&self) -> u64 {
        self.freshness_ttl_ms
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn put(&self, id: PlayerId, kind: StatKind, stats: CachedStats) {
        let key = (id, kind);
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(key, stats);
    }

    pub fn get(&self, id: PlayerId, kind: StatKind) -> Option<CachedStats> {
        self.entries.get(&(id, kind)).map(|entry| *entry.value())
    }

    /// Like `get`, but treats stale entries as missing and counts why.
    pub fn get_if_fresh(&self, id: PlayerId, kind: StatKind, now_ms: u64) -> Option<CachedStats> {
        let Some(stats) = self.get(id, kind) else {
            self.cold_misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if stats.is_expired(self.freshness_ttl_ms, now_ms) {
            self.expired_misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(stats)
    }

    pub fn is_stale(&self, stats: &CachedStats, now_ms: u64) -> bool {
        stats.is_expired(self.freshness_ttl_ms, now_ms)
    }

    pub fn remove(&self, id: PlayerId, kind: StatKind) -> Option<CachedStats> {
        self.entries.remove(&(id, kind)).map(|(_, stats)| stats)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn misses(&self) -> MissSnapshot {
        MissSnapshot {
            cold: self.cold_misses.load(Ordering::Relaxed),
            expired: self.expired_misses.load(Ordering::Relaxed),
        }
    }

    pub fn record_cold_miss(&self) {
        self.cold_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_miss(&self) {
        self.expired_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_misses(&self) {
        self.cold_misses.store(0, Ordering::Relaxed);
        self.expired_misses.store(0, Ordering::Relaxed);
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .map(|entry| {
                let (id, kind) = *entry.key();
                SnapshotEntry {
                    id,
                    kind,
                    stats: *entry.value(),
                }
            })
            .collect();
        entries.sort_by_key(|e| (e.stats.fetched_at_ms, e.id));
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            entries,
        };

        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&file).context("serialize stats snapshot")?;
        fs::write(&tmp, json).context("write stats snapshot")?;
        fs::rename(&tmp, path).context("swap stats snapshot")?;
        Ok(())
    }

    /// Loads a snapshot written by `save_snapshot`. A missing, unreadable or
    /// outdated file loads nothing. Returns the number of entries restored.
    pub fn load_snapshot(&self, path: &Path) -> usize {
        let Ok(raw) = fs::read_to_string(path) else {
            return 0;
        };
        let file = match serde_json::from_str::<SnapshotFile>(&raw) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("ignoring stats snapshot {}: {err}", path.display());
                return 0;
            }
        };
        if file.version != SNAPSHOT_VERSION {
            return 0;
        }
        let mut restored = 0;
        for entry in file.entries {
            self.put(entry.id, entry.kind, entry.stats);
            restored += 1;
        }
        restored
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().fetched_at_ms)
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl StatsSource for StatsCache {
    // Stale values still render; freshness only decides whether to refetch.
    fn resolve_cached_stat(&self, id: PlayerId, kind: StatKind) -> Option<CachedStats> {
        self.get(id, kind)
    }
}

pub fn default_snapshot_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(SNAPSHOT_FILE))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}
