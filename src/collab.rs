//! Seams to the collaborators the roster pipeline consumes but does not own:
//! the config/mode gate, the resolved-stats cache and the fetch service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::identity::{CachedStats, PlayerId, StatKind};

pub trait FeatureGate {
    fn is_feature_enabled(&self) -> bool;

    fn is_eligible_context(&self) -> bool;
}

/// Non-blocking lookup; `None` means "not known yet".
pub trait StatsSource {
    fn resolve_cached_stat(&self, id: PlayerId, kind: StatKind) -> Option<CachedStats>;
}

/// Fire-and-forget request to the fetch subsystem.
pub trait FetchSink {
    fn submit_fetch_request(&self, id: PlayerId, kind: StatKind);
}

/// Gate backed by two flags that other threads may flip.
#[derive(Debug)]
pub struct StaticGate {
    enabled: AtomicBool,
    eligible: AtomicBool,
}

impl StaticGate {
    pub fn new(enabled: bool, eligible: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            eligible: AtomicBool::new(eligible),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_eligible(&self, eligible: bool) {
        self.eligible.store(eligible, Ordering::Relaxed);
    }
}

impl Default for StaticGate {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl FeatureGate for StaticGate {
    fn is_feature_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn is_eligible_context(&self) -> bool {
        self.eligible.load(Ordering::Relaxed)
    }
}

impl<T: FeatureGate + ?Sized> FeatureGate for Arc<T> {
    fn is_feature_enabled(&self) -> bool {
        (**self).is_feature_enabled()
    }

    fn is_eligible_context(&self) -> bool {
        (**self).is_eligible_context()
    }
}

impl<T: StatsSource + ?Sized> StatsSource for Arc<T> {
    fn resolve_cached_stat(&self, id: PlayerId, kind: StatKind) -> Option<CachedStats> {
        (**self).resolve_cached_stat(id, kind)
    }
}

impl<T: FetchSink + ?Sized> FetchSink for Arc<T> {
    fn submit_fetch_request(&self, id: PlayerId, kind: StatKind) {
        (**self).submit_fetch_request(id, kind)
    }
}

/// Forwards fetch requests over a channel; a closed channel drops the request.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: Sender<T>,
    wrap: fn(PlayerId, StatKind) -> T,
}

impl<T> ChannelSink<T> {
    pub fn new(tx: Sender<T>, wrap: fn(PlayerId, StatKind) -> T) -> Self {
        Self { tx, wrap }
    }
}

impl<T> FetchSink for ChannelSink<T> {
    fn submit_fetch_request(&self, id: PlayerId, kind: StatKind) {
        let _ = self.tx.send((self.wrap)(id, kind));
    }
}
