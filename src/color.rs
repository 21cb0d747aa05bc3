use ratatui::style::Color;
use serde::{Deserialize, Serialize};

pub const SECTION_SIGN: char = '§';
pub const RESET_CODE: &str = "§r";

/// The 16-colour legacy palette the roster renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl StatColor {
    pub const ALL: [StatColor; 16] = [
        StatColor::Black,
        StatColor::DarkBlue,
        StatColor::DarkGreen,
        StatColor::DarkAqua,
        StatColor::DarkRed,
        StatColor::DarkPurple,
        StatColor::Gold,
        StatColor::Gray,
        StatColor::DarkGray,
        StatColor::Blue,
        StatColor::Green,
        StatColor::Aqua,
        StatColor::Red,
        StatColor::LightPurple,
        StatColor::Yellow,
        StatColor::White,
    ];

    pub fn code_char(self) -> char {
        match self {
            StatColor::Black => '0',
            StatColor::DarkBlue => '1',
            StatColor::DarkGreen => '2',
            StatColor::DarkAqua => '3',
            StatColor::DarkRed => '4',
            StatColor::DarkPurple => '5',
            StatColor::Gold => '6',
            StatColor::Gray => '7',
            StatColor::DarkGray => '8',
            StatColor::Blue => '9',
            StatColor::Green => 'a',
            StatColor::Aqua => 'b',
            StatColor::Red => 'c',
            StatColor::LightPurple => 'd',
            StatColor::Yellow => 'e',
            StatColor::White => 'f',
        }
    }

    pub fn legacy_code(self) -> String {
        format!("{SECTION_SIGN}{}", self.code_char())
    }

    pub fn from_legacy_code(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.code_char() == code)
    }

    pub fn to_ratatui(self) -> Color {
        match self {
            StatColor::Black => Color::Black,
            StatColor::DarkBlue => Color::Rgb(0x00, 0x00, 0xAA),
            StatColor::DarkGreen => Color::Rgb(0x00, 0xAA, 0x00),
            StatColor::DarkAqua => Color::Rgb(0x00, 0xAA, 0xAA),
            StatColor::DarkRed => Color::Rgb(0xAA, 0x00, 0x00),
            StatColor::DarkPurple => Color::Rgb(0xAA, 0x00, 0xAA),
            StatColor::Gold => Color::Rgb(0xFF, 0xAA, 0x00),
            StatColor::Gray => Color::Rgb(0xAA, 0xAA, 0xAA),
            StatColor::DarkGray => Color::DarkGray,
            StatColor::Blue => Color::Rgb(0x55, 0x55, 0xFF),
            StatColor::Green => Color::Rgb(0x55, 0xFF, 0x55),
            StatColor::Aqua => Color::Rgb(0x55, 0xFF, 0xFF),
            StatColor::Red => Color::Rgb(0xFF, 0x55, 0x55),
            StatColor::LightPurple => Color::Rgb(0xFF, 0x55, 0xFF),
            StatColor::Yellow => Color::Rgb(0xFF, 0xFF, 0x55),
            StatColor::White => Color::White,
        }
    }
}

fn is_format_code(code: char) -> bool {
    matches!(code.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Rewrites user-typed `&x` codes into `§x` codes. Unknown pairs are kept as-is.
pub fn translate_ampersand_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '&'
            && let Some(&next) = chars.peek()
            && is_format_code(next)
        {
            out.push(SECTION_SIGN);
            out.push(next.to_ascii_lowercase());
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}

/// Drops every `§x` pair, leaving only the visible glyphs.
pub fn strip_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == SECTION_SIGN {
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}
