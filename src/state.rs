use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;

use crate::identity::{CachedStats, PlayerId, StatKind};
use crate::pipeline::RosterEntry;
use crate::stats_cache::StatsCache;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    PlayerJoined(RosterEntry),
    PlayerLeft(PlayerId),
    StatsResolved {
        id: PlayerId,
        kind: StatKind,
        stats: CachedStats,
    },
    FetchFailed {
        id: PlayerId,
        reason: String,
    },
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    FetchStats { id: PlayerId, kind: StatKind },
    SetPaused(bool),
    Shutdown,
}

impl ProviderCommand {
    pub fn fetch(id: PlayerId, kind: StatKind) -> Self {
        ProviderCommand::FetchStats { id, kind }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub roster: Vec<RosterEntry>,
    pub cache: Arc<StatsCache>,
    pub kind: StatKind,
    pub selected: usize,
    pub paused: bool,
    pub help_overlay: bool,
    pub fetches_resolved: u64,
    pub fetches_failed: u64,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(cache: Arc<StatsCache>) -> Self {
        Self {
            roster: Vec::new(),
            cache,
            kind: StatKind::Bedwars,
            selected: 0,
            paused: false,
            help_overlay: false,
            fetches_resolved: 0,
            fetches_failed: 0,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn select_next(&mut self) {
        if self.roster.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1).min(self.roster.len() - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_entry(&self) -> Option<&RosterEntry> {
        self.roster.get(self.selected)
    }

    fn clamp_selection(&mut self) {
        if self.roster.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.roster.len() {
            self.selected = self.roster.len() - 1;
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::PlayerJoined(entry) => {
            let existing = entry
                .id
                .and_then(|id| state.roster.iter().position(|e| e.id == Some(id)));
            match existing {
                Some(idx) => state.roster[idx] = entry,
                None => {
                    state.push_log(format!("[INFO] {} joined", entry.name));
                    state.roster.push(entry);
                    state.roster.sort_by_key(|e| e.name.to_ascii_lowercase());
                }
            }
        }
        Delta::PlayerLeft(id) => {
            if let Some(idx) = state.roster.iter().position(|e| e.id == Some(id)) {
                let entry = state.roster.remove(idx);
                state.push_log(format!("[INFO] {} left", entry.name));
            }
            // Cached stats and throttle records age out on their own.
            state.clamp_selection();
        }
        Delta::StatsResolved { id, kind, stats } => {
            state.cache.put(id, kind, stats);
            state.fetches_resolved += 1;
        }
        Delta::FetchFailed { id, reason } => {
            state.fetches_failed += 1;
            state.push_log(format!("[WARN] Stats fetch for {} failed: {reason}", id.trimmed()));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
