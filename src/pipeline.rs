use std::sync::Arc;

use crate::collab::{FeatureGate, FetchSink, StatsSource};
use crate::format::{FormattedLabel, format_label};
use crate::identity::{PlayerId, StatKind};
use crate::metrics::TextMetrics;
use crate::throttle::FetchThrottle;
use crate::width::RowRenderState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: Option<PlayerId>,
    pub name: String,
}

impl RosterEntry {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub label: Option<FormattedLabel>,
    /// Row name padded so plain-text column sizing leaves room for the label.
    pub padded_name: String,
}

/// Per-row stat decoration: gate, cache lookup, throttled fetch, label and
/// column padding.
///
/// Hosts with two callback sites call `name_hook` then `width_hook` for each
/// row, in that order. Hosts that can pass the row through call `render_row`.
pub struct RosterPipeline<G, S, F, M> {
    gate: G,
    source: S,
    sink: F,
    throttle: Arc<FetchThrottle>,
    metrics: M,
    kind: StatKind,
    refresh_after_ms: Option<u64>,
    row: RowRenderState,
}

impl<G, S, F, M> RosterPipeline<G, S, F, M>
where
    G: FeatureGate,
    S: StatsSource,
    F: FetchSink,
    M: TextMetrics,
{
    pub fn new(
        gate: G,
        source: S,
        sink: F,
        throttle: Arc<FetchThrottle>,
        metrics: M,
        kind: StatKind,
    ) -> Self {
        Self {
            gate,
            source,
            sink,
            throttle,
            metrics,
            kind,
            refresh_after_ms: None,
            row: RowRenderState::new(),
        }
    }

    /// Cached stats older than `ttl_ms` still render but also trigger a
    /// throttled refetch.
    pub fn with_refresh_after(mut self, ttl_ms: u64) -> Self {
        self.refresh_after_ms = Some(ttl_ms);
        self
    }

    pub fn throttle(&self) -> &Arc<FetchThrottle> {
        &self.throttle
    }

    pub fn kind(&self) -> StatKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: StatKind) {
        self.kind = kind;
    }

    pub fn current_row(&self) -> Option<PlayerId> {
        self.row.current()
    }

    /// First hook of a row. Captures the row's identity, requests stats when
    /// they are missing or stale, and returns the label when stats exist. The
    /// label's extra width is kept in the row slot for `width_hook`.
    pub fn name_hook(&mut self, entry: &RosterEntry, now: u64) -> Option<FormattedLabel> {
        match entry.id {
            Some(id) => self.row.capture_row_identity(id),
            // Fresh slot: an id-less row must not inherit the previous row.
            None => self.row = RowRenderState::new(),
        }
        let label = self.resolve_label(entry, now)?;
        self.row.record_label_width(label.measured_extra_width);
        Some(label)
    }

    /// Second hook of a row. Pads `text` by the width `name_hook` recorded for
    /// the captured row; returns `text` unchanged when that row drew no label.
    /// Does not consult the stats source.
    pub fn width_hook(&self, text: &str) -> String {
        self.row.reconcile_width(
            text,
            self.row.label_extra_width(),
            self.metrics.glyph_width(' '),
        )
    }

    pub fn render_row(&mut self, entry: &RosterEntry, now: u64) -> RenderedRow {
        let label = self.name_hook(entry, now);
        let padded_name = self.width_hook(&entry.name);
        RenderedRow { label, padded_name }
    }

    fn is_active(&self) -> bool {
        self.gate.is_feature_enabled() && self.gate.is_eligible_context()
    }

    fn resolve_label(&self, entry: &RosterEntry, now: u64) -> Option<FormattedLabel> {
        if !self.is_active() {
            return None;
        }
        let id = entry.id?;
        if id.is_synthetic() {
            return None;
        }

        let Some(cached) = self.source.resolve_cached_stat(id, self.kind) else {
            self.request_if_due(id, now);
            return None;
        };
        if let Some(ttl) = self.refresh_after_ms
            && cached.is_expired(ttl, now)
        {
            self.request_if_due(id, now);
        }
        if cached.nicked {
            return None;
        }
        Some(format_label(&entry.name, &cached.stat, &self.metrics))
    }

    fn request_if_due(&self, id: PlayerId, now: u64) {
        if self.throttle.should_fetch(id, now) {
            self.sink.submit_fetch_request(id, self.kind);
        }
    }
}
