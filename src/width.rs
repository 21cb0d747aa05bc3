use crate::format::FormattedLabel;
use crate::identity::PlayerId;
use crate::metrics::TextMetrics;

/// Number of space glyphs that cover `extra_width`, rounded up. Zero when
/// either measurement is non-positive.
pub fn spaces_needed(extra_width: i32, space_glyph_width: i32) -> usize {
    if extra_width <= 0 || space_glyph_width <= 0 {
        return 0;
    }
    let extra = extra_width as i64;
    let space = space_glyph_width as i64;
    ((extra + space - 1) / space) as usize
}

pub fn pad_with_spaces(text: &str, count: usize) -> String {
    let mut out = String::with_capacity(text.len() + count);
    out.push_str(text);
    out.extend(std::iter::repeat_n(' ', count));
    out
}

/// Padding that reserves room for `label` in a column measured as plain text.
pub fn padding_for(label: &FormattedLabel, metrics: &impl TextMetrics) -> usize {
    spaces_needed(label.measured_extra_width, metrics.glyph_width(' '))
}

/// Per-row slot tying the name hook to the later width hook of the same row.
///
/// Precondition: `capture_row_identity` runs before `reconcile_width` within
/// each row. Nothing clears the slot; the next row's capture replaces it, and
/// a second capture before reconciliation simply wins. A capture also forgets
/// the previous row's label width, so a row only ever sees the width its own
/// name hook recorded. Owned by the render pass only, so it carries no
/// synchronisation.
#[derive(Debug, Default, Clone)]
pub struct RowRenderState {
    current: Option<PlayerId>,
    label_extra_width: i32,
}

impl RowRenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_row_identity(&mut self, id: PlayerId) {
        self.current = Some(id);
        self.label_extra_width = 0;
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.current
    }

    /// Records the extra width of the label drawn for the captured row.
    /// Ignored when nothing is captured.
    pub fn record_label_width(&mut self, extra_width: i32) {
        if self.current.is_some() {
            self.label_extra_width = extra_width.max(0);
        }
    }

    /// Width recorded for the captured row; 0 when its row drew no label.
    pub fn label_extra_width(&self) -> i32 {
        self.label_extra_width
    }

    /// Appends enough spaces to `text` to cover `extra_width`. Returns the
    /// text untouched when no row is captured or a measurement is non-positive.
    pub fn reconcile_width(&self, text: &str, extra_width: i32, space_glyph_width: i32) -> String {
        if self.current.is_none() {
            return text.to_string();
        }
        pad_with_spaces(text, spaces_needed(extra_width, space_glyph_width))
    }

    /// Capture and reconcile in one call, for hosts that can pass the row
    /// context directly.
    pub fn reconcile_row(
        &mut self,
        id: PlayerId,
        text: &str,
        extra_width: i32,
        space_glyph_width: i32,
    ) -> String {
        self.capture_row_identity(id);
        self.reconcile_width(text, extra_width, space_glyph_width)
    }
}
