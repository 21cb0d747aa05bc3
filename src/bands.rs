use crate::color::StatColor;

const PRESTIGE_TIER_WIDTH: i64 = 100;
const PRESTIGE_CYCLE_LEN: u8 = 10;
const PRESTIGE_TERMINAL_TIER: u8 = PRESTIGE_CYCLE_LEN * 2;

const PRESTIGE_COLORS: [StatColor; PRESTIGE_CYCLE_LEN as usize] = [
    StatColor::Gray,
    StatColor::White,
    StatColor::Gold,
    StatColor::Aqua,
    StatColor::DarkGreen,
    StatColor::DarkAqua,
    StatColor::DarkRed,
    StatColor::LightPurple,
    StatColor::Blue,
    StatColor::DarkPurple,
];

const PRESTIGE_TITLES: [&str; PRESTIGE_CYCLE_LEN as usize] = [
    "Stone", "Iron", "Gold", "Diamond", "Emerald", "Sapphire", "Ruby", "Crystal", "Opal",
    "Amethyst",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatioBand {
    Low,
    Neutral,
    AboveAverage,
    High,
    Exceptional,
}

impl RatioBand {
    /// Inclusive lower bounds. A missing or non-finite ratio lands in `Low`,
    /// matching the `?` placeholder drawn for it.
    pub fn for_ratio(ratio: Option<f64>) -> Self {
        let Some(value) = ratio.filter(|v| v.is_finite()) else {
            return RatioBand::Low;
        };
        if value >= 10.0 {
            RatioBand::Exceptional
        } else if value >= 6.0 {
            RatioBand::High
        } else if value >= 3.0 {
            RatioBand::AboveAverage
        } else if value >= 1.0 {
            RatioBand::Neutral
        } else {
            RatioBand::Low
        }
    }

    pub fn color(self) -> StatColor {
        match self {
            RatioBand::Exceptional => StatColor::Gold,
            RatioBand::High => StatColor::Yellow,
            RatioBand::AboveAverage => StatColor::Green,
            RatioBand::Neutral => StatColor::White,
            RatioBand::Low => StatColor::Gray,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RatioBand::Exceptional => "exceptional",
            RatioBand::High => "high",
            RatioBand::AboveAverage => "above-average",
            RatioBand::Neutral => "neutral",
            RatioBand::Low => "low",
        }
    }
}

/// Prestige band: two 10-tier cycles of 100 levels each, then one terminal band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrestigeBand {
    tier: u8,
}

impl PrestigeBand {
    pub fn for_level(level: i64) -> Self {
        let tier = (level.max(0) / PRESTIGE_TIER_WIDTH).min(PRESTIGE_TERMINAL_TIER as i64);
        Self { tier: tier as u8 }
    }

    /// 0..=19 for the two cycles, 20 for every level at or past 2000.
    pub fn tier(self) -> u8 {
        self.tier
    }

    pub fn is_prime(self) -> bool {
        (PRESTIGE_CYCLE_LEN..PRESTIGE_TERMINAL_TIER).contains(&self.tier)
    }

    pub fn is_terminal(self) -> bool {
        self.tier >= PRESTIGE_TERMINAL_TIER
    }

    pub fn color(self) -> StatColor {
        if self.is_terminal() {
            return PRESTIGE_COLORS[0];
        }
        PRESTIGE_COLORS[(self.tier % PRESTIGE_CYCLE_LEN) as usize]
    }

    pub fn title(self) -> String {
        if self.is_terminal() {
            return "Legend".to_string();
        }
        let base = PRESTIGE_TITLES[(self.tier % PRESTIGE_CYCLE_LEN) as usize];
        if self.is_prime() {
            format!("{base} Prime")
        } else {
            base.to_string()
        }
    }
}
