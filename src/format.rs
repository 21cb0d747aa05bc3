use crate::bands::{PrestigeBand, RatioBand};
use crate::color::{RESET_CODE, StatColor};
use crate::identity::ResolvedStat;
use crate::metrics::TextMetrics;

pub const RATIO_PLACEHOLDER: &str = "?";
pub const SEPARATOR: &str = " : ";
pub const SEPARATOR_COLOR: StatColor = StatColor::Gray;
pub const PRESTIGE_GLYPH: char = '✪';
// Colour of the row text itself when no prestige prefix leads the label.
pub const ROW_TEXT_COLOR: StatColor = StatColor::White;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSegment {
    pub text: String,
    /// `None` means the host's default colour for the row.
    pub color: Option<StatColor>,
}

impl LabelSegment {
    fn colored(text: impl Into<String>, color: StatColor) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLabel {
    /// Legacy `§`-coded form, ready for hosts that speak colour codes.
    pub text: String,
    pub leading_color: StatColor,
    pub measured_extra_width: i32,
    pub segments: Vec<LabelSegment>,
}

impl FormattedLabel {
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

pub fn ratio_text(ratio: Option<f64>) -> String {
    match ratio {
        Some(value) if value.is_finite() => format!("{value:.2}"),
        _ => RATIO_PLACEHOLDER.to_string(),
    }
}

pub fn prestige_text(level: i64) -> String {
    format!("[{level}{PRESTIGE_GLYPH}] ")
}

/// Builds the label appended around a roster row's text.
///
/// `measured_extra_width` is how much wider the label draws than `row_text`
/// alone, never negative.
pub fn format_label(
    row_text: &str,
    stat: &ResolvedStat,
    metrics: &impl TextMetrics,
) -> FormattedLabel {
    let mut segments = Vec::with_capacity(4);
    let mut text = String::new();
    let mut leading_color = ROW_TEXT_COLOR;

    if let Some(level) = stat.prestige_level {
        let color = PrestigeBand::for_level(level).color();
        let prefix = prestige_text(level);
        leading_color = color;
        text.push_str(&color.legacy_code());
        text.push_str(prefix.trim_end());
        text.push_str(RESET_CODE);
        text.push(' ');
        segments.push(LabelSegment::colored(prefix, color));
    }

    text.push_str(row_text);
    segments.push(LabelSegment::plain(row_text));

    let ratio_color = RatioBand::for_ratio(stat.ratio).color();
    let ratio = ratio_text(stat.ratio);
    text.push_str(&SEPARATOR_COLOR.legacy_code());
    text.push_str(SEPARATOR);
    text.push_str(&ratio_color.legacy_code());
    text.push_str(&ratio);
    segments.push(LabelSegment::colored(SEPARATOR, SEPARATOR_COLOR));
    segments.push(LabelSegment::colored(ratio, ratio_color));

    let mut label = FormattedLabel {
        text,
        leading_color,
        measured_extra_width: 0,
        segments,
    };
    let extra = metrics.text_width(&label.plain_text()) - metrics.text_width(row_text);
    label.measured_extra_width = extra.max(0);
    label
}
