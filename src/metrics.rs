use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::color::SECTION_SIGN;

const DEFAULT_ADVANCE: i32 = 6;

// Advance widths of the default bitmap font, glyph plus its one-pixel gap.
static GLYPH_ADVANCES: Lazy<HashMap<char, i32>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for ch in ['i', '!', '.', ',', ':', ';', '\'', '|'] {
        table.insert(ch, 2);
    }
    for ch in ['l', '`'] {
        table.insert(ch, 3);
    }
    for ch in [' ', 'I', 't', '[', ']', '"', '(', ')', '*'] {
        table.insert(ch, 4);
    }
    for ch in ['f', 'k', '<', '>', '{', '}'] {
        table.insert(ch, 5);
    }
    for ch in ['@', '~'] {
        table.insert(ch, 7);
    }
    table
});

/// Opaque text measurement, as provided by whatever draws the roster.
///
/// `text_width` must ignore `§` colour codes; `glyph_width` measures a single
/// visible character.
pub trait TextMetrics {
    fn glyph_width(&self, ch: char) -> i32;

    fn text_width(&self, text: &str) -> i32 {
        let mut width = 0;
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            if ch == SECTION_SIGN {
                chars.next();
                continue;
            }
            width += self.glyph_width(ch);
        }
        width
    }
}

impl<T: TextMetrics + ?Sized> TextMetrics for &T {
    fn glyph_width(&self, ch: char) -> i32 {
        (**self).glyph_width(ch)
    }

    fn text_width(&self, text: &str) -> i32 {
        (**self).text_width(text)
    }
}

/// One cell per character, the terminal case.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonospaceMetrics;

impl TextMetrics for MonospaceMetrics {
    fn glyph_width(&self, _ch: char) -> i32 {
        1
    }
}

/// Variable-width bitmap font metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlyphTableMetrics;

impl TextMetrics for GlyphTableMetrics {
    fn glyph_width(&self, ch: char) -> i32 {
        GLYPH_ADVANCES.get(&ch).copied().unwrap_or(DEFAULT_ADVANCE)
    }
}
