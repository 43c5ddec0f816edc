//! Effective background resolution.
//!
//! The browser never reports "the color behind this text"; it reports each
//! element's own `background-color`, which is usually transparent. The
//! effective background is found by climbing the ancestor chain until
//! something paints. A background image ends the climb early because its
//! pixels are unknown, and the resolver then falls back to the page-level
//! colors that most likely sit underneath.
//!
//! Everything here works on a captured [`StyleNode`] chain so it can be
//! tested without a browser.

use crate::color::{parse_color, Color};
use serde::{Deserialize, Serialize};

/// Upper bound on ancestors inspected before giving up
pub const MAX_CLIMB_DEPTH: usize = 64;

/// Background-related computed style of one node in an ancestor chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleNode {
    /// Computed `background-color`
    #[serde(default)]
    pub background_color: String,
    /// Computed `background-image`
    #[serde(default)]
    pub background_image: String,
}

impl StyleNode {
    /// Create a node from raw computed values
    #[must_use]
    pub fn new(background_color: impl Into<String>, background_image: impl Into<String>) -> Self {
        Self {
            background_color: background_color.into(),
            background_image: background_image.into(),
        }
    }

    /// Node with only a background color
    #[must_use]
    pub fn color(background_color: impl Into<String>) -> Self {
        Self::new(background_color, "none")
    }

    fn has_image(&self) -> bool {
        let image = self.background_image.trim();
        !image.is_empty() && image != "none"
    }
}

/// What a climb step decided about one node
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Keep climbing
    Continue,
    /// Stop with a value
    Found(T),
    /// Stop without a value
    Stop,
}

/// Outcome of a bounded climb
#[derive(Debug, Clone, PartialEq)]
pub enum Climb<T> {
    /// A node produced a value
    Found(T),
    /// A node stopped the climb before any value was found
    Stopped,
    /// The chain (or depth bound) ran out
    Exhausted,
}

/// Walk `nodes` in order, at most `max_depth` of them, letting `step` decide
/// at each node whether to continue, stop, or produce a value.
pub fn climb<N, T>(nodes: &[N], max_depth: usize, mut step: impl FnMut(&N) -> Step<T>) -> Climb<T> {
    for node in nodes.iter().take(max_depth) {
        match step(node) {
            Step::Continue => {}
            Step::Found(value) => return Climb::Found(value),
            Step::Stop => return Climb::Stopped,
        }
    }
    Climb::Exhausted
}

/// Theme selected by the document's theme attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme (also any unrecognized attribute value)
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl Theme {
    /// Interpret a theme attribute value
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("dark") => Self::Dark,
            _ => Self::Light,
        }
    }
}

/// Page-level colors used when the ancestor climb cannot decide
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundFallback {
    /// Computed `background-color` of `<body>`
    pub body: Color,
    /// Value of the themed background custom property
    pub theme_var: Color,
    /// Active theme
    pub theme: Theme,
    /// Hardcoded light-theme default
    pub light_default: Color,
    /// Hardcoded dark-theme default
    pub dark_default: Color,
}

impl BackgroundFallback {
    /// First usable color in body → theme var → hardcoded default order
    #[must_use]
    pub fn resolve(&self) -> Color {
        if self.body.is_usable() {
            return self.body;
        }
        if self.theme_var.is_usable() {
            return self.theme_var;
        }
        match self.theme {
            Theme::Light => self.light_default,
            Theme::Dark => self.dark_default,
        }
    }
}

/// Resolve the effective background behind the first node of `chain`.
///
/// `chain` runs from the element itself up to the root.
#[must_use]
pub fn resolve_background(chain: &[StyleNode], fallback: &BackgroundFallback) -> Color {
    let outcome = climb(chain, MAX_CLIMB_DEPTH, |node| {
        let color = parse_color(&node.background_color);
        if color.is_usable() {
            Step::Found(color)
        } else if node.has_image() {
            Step::Stop
        } else {
            Step::Continue
        }
    });
    match outcome {
        Climb::Found(color) => color,
        Climb::Stopped | Climb::Exhausted => fallback.resolve(),
    }
}
