use std::env;

use crate::throttle::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_ENTRY_TTL_MS, DEFAULT_RETRY_INTERVAL_MS, ThrottleConfig,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub tab_stats_enabled: bool,
    pub throttle: ThrottleConfig,
    pub stats_cache_ttl_secs: u64,
    pub stats_cache_max: usize,
    pub roster_size: usize,
    pub fetch_parallelism: usize,
    pub fetch_latency_ms: u64,
    pub fetch_failure_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    /// Reads the process environment. Binaries load `.env.local` / `.env`
    /// through dotenvy before calling this.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let num = |key: &str| lookup(key).and_then(|val| val.trim().parse::<u64>().ok());

        let retry_interval_ms = num("TAB_FETCH_RETRY_MS")
            .unwrap_or(DEFAULT_RETRY_INTERVAL_MS)
            .max(250);
        let entry_ttl_ms = num("TAB_FETCH_ENTRY_TTL_MS")
            .unwrap_or(DEFAULT_ENTRY_TTL_MS)
            .max(retry_interval_ms);
        let cleanup_interval_ms = num("TAB_FETCH_CLEANUP_MS")
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_MS)
            .max(1_000);

        let tab_stats_enabled = lookup("TAB_STATS_ENABLED")
            .and_then(|val| parse_bool(&val))
            .unwrap_or(true);
        let fetch_failure_rate = lookup("FETCH_FAILURE_RATE")
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|val| val.is_finite())
            .unwrap_or(0.1)
            .clamp(0.0, 1.0);

        Self {
            tab_stats_enabled,
            throttle: ThrottleConfig {
                retry_interval_ms,
                entry_ttl_ms,
                cleanup_interval_ms,
            },
            stats_cache_ttl_secs: num("STATS_CACHE_TTL_SECS").unwrap_or(3_600).max(1),
            stats_cache_max: num("STATS_CACHE_MAX").unwrap_or(500).clamp(1, 10_000) as usize,
            roster_size: num("ROSTER_SIZE").unwrap_or(16).clamp(1, 80) as usize,
            fetch_parallelism: num("FETCH_PARALLELISM").unwrap_or(4).clamp(1, 32) as usize,
            fetch_latency_ms: num("FETCH_LATENCY_MS").unwrap_or(600).min(30_000),
            fetch_failure_rate,
        }
    }

    pub fn stats_cache_ttl_ms(&self) -> u64 {
        self.stats_cache_ttl_secs.saturating_mul(1_000)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
