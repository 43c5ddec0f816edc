//! Color parsing and WCAG contrast math.
//!
//! Computed styles arrive as strings (`rgb(…)`, `rgba(…)`, hex from custom
//! properties). Parsing never fails: anything unreadable becomes the
//! fully-transparent black sentinel, and callers treat alpha below
//! [`MIN_USABLE_ALPHA`] as "not a usable color".

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Minimum contrast ratio for body and label text
pub const MIN_CONTRAST_TEXT: f64 = 3.0;

/// Minimum contrast ratio for accent glyphs (icons, checkmarks, carets)
pub const MIN_CONTRAST_ACCENT: f64 = 3.0;

/// Minimum contrast ratio for control borders against their surface
pub const MIN_CONTRAST_BORDER: f64 = 1.6;

/// Alpha at or above which a background paints enough to count
pub const MIN_USABLE_ALPHA: f64 = 0.1;

/// RGBA color. Channels are 0-255, alpha is 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
    /// Alpha (0-1)
    pub a: f64,
}

impl Color {
    /// Fully transparent black, the result of any unparseable input
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0.0);

    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Create an opaque color
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color with alpha
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Relative luminance (per WCAG 2.1)
    #[must_use]
    pub fn relative_luminance(&self) -> f64 {
        luminance(self.r, self.g, self.b)
    }

    /// Contrast ratio against another color. Alpha is ignored.
    #[must_use]
    pub fn contrast_ratio(&self, other: &Self) -> f64 {
        contrast_ratio(self, other)
    }

    /// Whether this color paints enough to count as a background
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.a >= MIN_USABLE_ALPHA
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.a - 1.0).abs() < f64::EPSILON {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Convert sRGB to linear RGB (per WCAG 2.1)
fn srgb_to_linear(value: f64) -> f64 {
    if value <= 0.03928 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance of an 8-bit sRGB triple, in [0, 1]
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    let r = srgb_to_linear(f64::from(r) / 255.0);
    let g = srgb_to_linear(f64::from(g) / 255.0);
    let b = srgb_to_linear(f64::from(b) / 255.0);

    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// WCAG contrast ratio, in [1, 21]
#[must_use]
pub fn contrast_ratio(fg: &Color, bg: &Color) -> f64 {
    let l1 = fg.relative_luminance();
    let l2 = bg.relative_luminance();

    let lighter = l1.max(l2);
    let darker = l1.min(l2);

    (lighter + 0.05) / (darker + 0.05)
}

fn functional_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^rgba?\(\s*([^()]*?)\s*\)$").ok())
        .as_ref()
}

/// Parse a CSS color string.
///
/// Accepts `rgb()`/`rgba()` with comma, space, or slash separators, hex
/// (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`) and `transparent`. Everything
/// else returns [`Color::TRANSPARENT`].
#[must_use]
pub fn parse_color(text: &str) -> Color {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(Color::TRANSPARENT);
    }
    if let Some(caps) = functional_pattern().and_then(|re| re.captures(text)) {
        return parse_components(&caps[1]).unwrap_or(Color::TRANSPARENT);
    }
    Color::TRANSPARENT
}

fn parse_components(body: &str) -> Option<Color> {
    let parts: Vec<&str> = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }
    let r = parse_channel(parts[0])?;
    let g = parse_channel(parts[1])?;
    let b = parse_channel(parts[2])?;
    let a = match parts.get(3) {
        Some(alpha) => parse_alpha(alpha)?,
        None => 1.0,
    };
    Some(Color::rgba(r, g, b, a))
}

fn parse_channel(part: &str) -> Option<u8> {
    let value = if let Some(pct) = part.strip_suffix('%') {
        pct.parse::<f64>().ok()? * 2.55
    } else {
        part.parse::<f64>().ok()?
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(part: &str) -> Option<f64> {
    let value = if let Some(pct) = part.strip_suffix('%') {
        pct.parse::<f64>().ok()? / 100.0
    } else {
        part.parse::<f64>().ok()?
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let a = if expanded.len() == 8 {
        f64::from(byte(6)?) / 255.0
    } else {
        1.0
    };
    Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, a))
}
