use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::clock::Clock;
use crate::identity::PlayerId;

pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 4_000;
pub const DEFAULT_ENTRY_TTL_MS: u64 = 5 * 60 * 1_000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub retry_interval_ms: u64,
    pub entry_ttl_ms: u64,
    pub cleanup_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            entry_ttl_ms: DEFAULT_ENTRY_TTL_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleSnapshot {
    pub tracked: usize,
    pub allowed: u64,
    pub blocked: u64,
    pub sweeps: u64,
    pub evicted: u64,
    pub last_sweep_at: u64,
}

/// Gates outbound stat fetches per player.
///
/// One attempt timestamp is kept per identity. A fetch is allowed when there
/// is no timestamp yet or the last one is at least `retry_interval_ms` old;
/// allowing records the attempt in the same map operation. Records older than
/// `entry_ttl_ms` are dropped by a sweep that runs at most once per
/// `cleanup_interval_ms`, claimed by whichever caller wins the cursor CAS.
#[derive(Debug)]
pub struct FetchThrottle {
    config: ThrottleConfig,
    attempts: DashMap<PlayerId, u64>,
    last_sweep_at: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    sweeps: AtomicU64,
    evicted: AtomicU64,
}

impl Default for FetchThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl FetchThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            attempts: DashMap::new(),
            last_sweep_at: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    /// Returns `true` when the caller should issue a fetch for `id`; the
    /// attempt is recorded before returning.
    pub fn should_fetch(&self, id: PlayerId, now: u64) -> bool {
        self.maybe_sweep(now);

        let allowed = match self.attempts.entry(id) {
            Entry::Occupied(mut entry) => {
                // A timestamp behind the stored one counts as no time elapsed.
                if now.saturating_sub(*entry.get()) >= self.config.retry_interval_ms {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    pub fn should_fetch_with(&self, id: PlayerId, clock: &dyn Clock) -> bool {
        self.should_fetch(id, clock.now_ms())
    }

    /// Sweeps now regardless of the cleanup interval. The cursor only moves
    /// forward.
    pub fn force_sweep(&self, now: u64) -> usize {
        self.last_sweep_at.fetch_max(now, Ordering::AcqRel);
        self.sweep(now)
    }

    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_tracked(&self, id: &PlayerId) -> bool {
        self.attempts.contains_key(id)
    }

    pub fn last_attempt(&self, id: &PlayerId) -> Option<u64> {
        self.attempts.get(id).map(|entry| *entry.value())
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn last_sweep_at(&self) -> u64 {
        self.last_sweep_at.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ThrottleSnapshot {
        ThrottleSnapshot {
            tracked: self.tracked(),
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            sweeps: self.sweeps(),
            evicted: self.evicted.load(Ordering::Relaxed),
            last_sweep_at: self.last_sweep_at(),
        }
    }

    fn maybe_sweep(&self, now: u64) {
        let last = self.last_sweep_at.load(Ordering::Acquire);
        if now.saturating_sub(last) < self.config.cleanup_interval_ms {
            return;
        }
        // Losers skip this round; the winner has already claimed the interval.
        if self
            .last_sweep_at
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.sweep(now);
    }

    fn sweep(&self, now: u64) -> usize {
        let ttl = self.config.entry_ttl_ms;
        let mut removed = 0usize;
        self.attempts.retain(|_, last| {
            let keep = now.saturating_sub(*last) <= ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
        log::debug!(
            "fetch throttle sweep at {now}: evicted {removed}, tracking {}",
            self.attempts.len()
        );
        removed
    }
}
