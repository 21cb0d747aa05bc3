use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Prestige XP curve: every 100 levels costs the same, the first four levels of
// each prestige are cheaper than the rest.
const FIRST_LEVEL_EXPERIENCE: [i64; 4] = [500, 1000, 2000, 3500];
const EXPERIENCE_PER_LEVEL: i64 = 5000;
const EXPERIENCE_PER_PRESTIGE: i64 = 487_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new(raw: Uuid) -> Self {
        Self(raw)
    }

    pub fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Accepts both the dashed and the 32-char undashed form.
    pub fn parse(raw: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(raw.trim())
            .with_context(|| format!("invalid player id {raw:?}"))?;
        Ok(Self(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Undashed lowercase hex, the key format the fetch service expects.
    pub fn trimmed(&self) -> String {
        self.0.simple().to_string()
    }

    /// Version 2 ids are handed out by the server to NPC and bot rows; they
    /// have no stats behind them.
    pub fn is_synthetic(&self) -> bool {
        self.0.get_version_num() == 2
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatKind {
    #[default]
    Bedwars,
    Duels,
    SkyWars,
}

impl StatKind {
    pub fn type_id(self) -> &'static str {
        match self {
            StatKind::Bedwars => "BEDWARS",
            StatKind::Duels => "DUELS",
            StatKind::SkyWars => "SKYWARS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedStat {
    pub ratio: Option<f64>,
    pub prestige_level: Option<i64>,
}

impl ResolvedStat {
    pub fn new(ratio: Option<f64>, prestige_level: Option<i64>) -> Self {
        Self {
            ratio,
            prestige_level,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ratio.is_none() && self.prestige_level.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedStats {
    pub stat: ResolvedStat,
    #[serde(default)]
    pub nicked: bool,
    pub fetched_at_ms: u64,
}

impl CachedStats {
    pub fn new(stat: ResolvedStat, fetched_at_ms: u64) -> Self {
        Self {
            stat,
            nicked: false,
            fetched_at_ms,
        }
    }

    pub fn nicked(fetched_at_ms: u64) -> Self {
        Self {
            stat: ResolvedStat::default(),
            nicked: true,
            fetched_at_ms,
        }
    }

    pub fn is_expired(&self, ttl_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.fetched_at_ms) >= ttl_ms
    }
}

pub fn ratio_from_counts(kills: u64, deaths: u64) -> Option<f64> {
    if kills == 0 && deaths == 0 {
        return None;
    }
    if deaths == 0 {
        return Some(kills as f64);
    }
    Some(kills as f64 / deaths as f64)
}

pub fn prestige_from_experience(experience: i64) -> i64 {
    if experience <= 0 {
        return 0;
    }
    let prestiges = experience / EXPERIENCE_PER_PRESTIGE;
    let mut level = prestiges * 100;
    let mut remaining = experience - prestiges * EXPERIENCE_PER_PRESTIGE;

    for cost in FIRST_LEVEL_EXPERIENCE {
        if remaining < cost {
            return level;
        }
        level += 1;
        remaining -= cost;
    }

    level + remaining / EXPERIENCE_PER_LEVEL
}
