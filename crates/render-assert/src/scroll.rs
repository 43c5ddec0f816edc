//! Scroll and clip evaluation for overlay menus.
//!
//! An overflowing dropdown should show a deliberate partial row ("peek") at
//! its clipped edge: neither a hard cut on a row boundary nor a whole extra
//! row. After scrolling to one extreme, the clipped row sits at the
//! *opposite* edge, so scrolling to the top measures the bottom edge and
//! vice versa.

use crate::geometry::{spread, Rect};
use crate::result::{ensure, Failure};
use serde::{Deserialize, Serialize};

/// Slack applied to viewport, footer and width comparisons
pub const EDGE_TOLERANCE_PX: f64 = 1.0;

/// Maximum amount an item may exceed the median item height
pub const MAX_ITEM_HEIGHT_EXCESS_PX: f64 = 6.0;

/// Minimum number of fully visible items in an open menu
pub const MIN_VISIBLE_ITEMS: usize = 3;

/// Extreme a scroller was moved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollEdge {
    /// `scrollTop = 0`
    Top,
    /// `scrollTop = scrollHeight`
    Bottom,
}

impl ScrollEdge {
    /// Value of the scroll indicator attribute at this extreme
    #[must_use]
    pub const fn indicator(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Indicator value when content does not overflow
pub const INDICATOR_NONE: &str = "none";

/// Viewport size
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// `innerWidth`
    pub width: f64,
    /// `innerHeight`
    pub height: f64,
}

/// Geometry and scroll state of a scroll container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollerMetrics {
    /// Border box
    pub rect: Rect,
    /// `scrollTop`
    pub scroll_top: f64,
    /// `scrollHeight`
    pub scroll_height: f64,
    /// `clientHeight`
    pub client_height: f64,
    /// `clientTop` (top border width)
    #[serde(default)]
    pub client_top: f64,
    /// `scrollWidth`
    pub scroll_width: f64,
    /// `clientWidth`
    pub client_width: f64,
    /// Computed `overscroll-behavior-y`
    #[serde(default)]
    pub overscroll_behavior_y: String,
}

impl ScrollerMetrics {
    /// Top of the visible content area
    #[must_use]
    pub fn visible_top(&self) -> f64 {
        self.rect.top + self.client_top
    }

    /// Bottom of the visible content area
    #[must_use]
    pub fn visible_bottom(&self) -> f64 {
        self.visible_top() + self.client_height
    }

    /// Content taller than the viewport of the scroller
    #[must_use]
    pub fn overflows_vertically(&self) -> bool {
        self.scroll_height > self.client_height + EDGE_TOLERANCE_PX
    }

    /// Content wider than the scroller
    #[must_use]
    pub fn overflows_horizontally(&self) -> bool {
        self.scroll_width > self.client_width + EDGE_TOLERANCE_PX
    }
}

/// Everything measured about an open menu in one round-trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMetrics {
    /// Viewport size
    pub viewport: Viewport,
    /// Outer menu box
    pub menu: Rect,
    /// Outer menu `scrollTop`
    pub outer_scroll_top: f64,
    /// Scroll indicator attribute on the outer menu
    #[serde(default)]
    pub indicator: Option<String>,
    /// Inner scroller, if found
    #[serde(default)]
    pub scroller: Option<ScrollerMetrics>,
    /// Menu item boxes
    #[serde(default)]
    pub items: Vec<Rect>,
    /// Trigger box
    #[serde(default)]
    pub trigger: Option<Rect>,
    /// Fixed footer box
    #[serde(default)]
    pub footer: Option<Rect>,
}

/// Accepted window for a peek. Tuned for Chromium's sub-pixel rounding;
/// other layout engines may need different values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeekTolerance {
    /// Clip must exceed this and stay this far from the full item height
    pub min_clip_px: f64,
    /// Lowest accepted clip ratio
    pub min_ratio: f64,
    /// Highest accepted clip ratio
    pub max_ratio: f64,
}

impl Default for PeekTolerance {
    fn default() -> Self {
        Self {
            min_clip_px: 3.0,
            min_ratio: 0.18,
            max_ratio: 0.82,
        }
    }
}

/// Clip of the boundary row at one edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekMeasurement {
    /// Pixels of the row hidden past the edge
    pub clip_px: f64,
    /// Row height
    pub item_height: f64,
    /// `clip_px / item_height`
    pub ratio: f64,
}

impl PeekMeasurement {
    /// Build from clip and height
    #[must_use]
    pub fn new(clip_px: f64, item_height: f64) -> Self {
        let ratio = if item_height > 0.0 {
            clip_px / item_height
        } else {
            0.0
        };
        Self {
            clip_px,
            item_height,
            ratio,
        }
    }
}

/// Median of a list (0 for an empty one)
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Measure the row straddling the clipped edge after scrolling to `scrolled_to`.
///
/// With no straddling row the clip is 0 against the median row height.
#[must_use]
pub fn boundary_peek(scroller: &ScrollerMetrics, items: &[Rect], scrolled_to: ScrollEdge) -> PeekMeasurement {
    let straddling = |edge: f64| {
        items
            .iter()
            .find(|item| item.top < edge && item.bottom > edge)
    };
    let measured = match scrolled_to {
        ScrollEdge::Top => {
            let edge = scroller.visible_bottom();
            straddling(edge).map(|item| (item.bottom - edge, item.height))
        }
        ScrollEdge::Bottom => {
            let edge = scroller.visible_top();
            straddling(edge).map(|item| (edge - item.top, item.height))
        }
    };
    let (clip, height) = measured.unwrap_or_else(|| {
        let heights: Vec<f64> = items.iter().map(|i| i.height).collect();
        (0.0, median(&heights))
    });
    PeekMeasurement::new(clip, height)
}

/// `min_clip < clip < height - min_clip` and `min_ratio <= ratio <= max_ratio`
pub fn evaluate_peek(
    peek: &PeekMeasurement,
    tolerance: &PeekTolerance,
    scrolled_to: ScrollEdge,
) -> Result<(), Failure> {
    let clip_ok = peek.clip_px > tolerance.min_clip_px
        && peek.clip_px < peek.item_height - tolerance.min_clip_px;
    let ratio_ok = peek.ratio >= tolerance.min_ratio && peek.ratio <= tolerance.max_ratio;
    ensure(clip_ok && ratio_ok, || {
        let clipped_edge = match scrolled_to {
            ScrollEdge::Top => "bottom",
            ScrollEdge::Bottom => "top",
        };
        Failure::threshold(
            "menu_peek",
            format!(
                "{clipped_edge} boundary row clipped {:.1}px of {:.1}px (ratio {:.2}, want {:.2}-{:.2} and {}px < clip < height-{}px)",
                peek.clip_px,
                peek.item_height,
                peek.ratio,
                tolerance.min_ratio,
                tolerance.max_ratio,
                tolerance.min_clip_px,
                tolerance.min_clip_px
            ),
        )
        .with("scrolled_to", scrolled_to)
        .with("peek", peek)
        .with("tolerance", tolerance)
    })
}

/// Indicator attribute equals `expected`
pub fn indicator_is(actual: Option<&str>, expected: &str) -> Result<(), Failure> {
    ensure(actual.map(str::trim) == Some(expected), || {
        Failure::threshold(
            "menu_scroll_indicator",
            format!("scroll indicator is {actual:?}, expected {expected:?}"),
        )
        .with("actual", actual)
        .with("expected", expected)
    })
}

/// Outer menu chrome never scrolls
pub fn outer_fixed(outer_scroll_top: f64) -> Result<(), Failure> {
    ensure(outer_scroll_top == 0.0, || {
        Failure::threshold(
            "menu_outer_fixed",
            format!("outer menu scrolled to {outer_scroll_top}px; only the inner list may scroll"),
        )
        .with("outer_scroll_top", outer_scroll_top)
    })
}

/// Scroll chaining to the page is blocked
pub fn overscroll_contained(behavior: &str) -> Result<(), Failure> {
    let behavior = behavior.trim();
    ensure(behavior == "contain" || behavior == "none", || {
        Failure::threshold(
            "menu_overscroll",
            format!("overscroll-behavior is {behavior:?}, expected contain or none"),
        )
        .with("overscroll_behavior", behavior)
    })
}

/// Menu stays inside the viewport on every side
pub fn within_viewport(menu: &Rect, viewport: &Viewport) -> Result<(), Failure> {
    let bounds = Rect::new(0.0, 0.0, viewport.width, viewport.height);
    let overhang = menu.overhang(&bounds);
    ensure(overhang <= EDGE_TOLERANCE_PX, || {
        Failure::threshold(
            "menu_viewport",
            format!(
                "menu exceeds the {}x{} viewport by {overhang:.1}px",
                viewport.width, viewport.height
            ),
        )
        .with("menu", menu)
        .with("viewport", viewport)
    })
}

/// Menu does not overlap the fixed footer
pub fn clear_of_footer(menu: &Rect, footer: &Rect) -> Result<(), Failure> {
    let overlap_x = menu.right.min(footer.right) - menu.left.max(footer.left);
    let overlap_y = menu.bottom.min(footer.bottom) - menu.top.max(footer.top);
    let overlaps = overlap_x > EDGE_TOLERANCE_PX && overlap_y > EDGE_TOLERANCE_PX;
    ensure(!overlaps, || {
        Failure::threshold(
            "menu_footer",
            format!("menu overlaps the footer by {overlap_y:.1}px vertically"),
        )
        .with("menu", menu)
        .with("footer", footer)
    })
}

/// Rows fully inside the scroller's visible area
#[must_use]
pub fn fully_visible_items(scroller: &ScrollerMetrics, items: &[Rect]) -> usize {
    let top = scroller.visible_top() - EDGE_TOLERANCE_PX;
    let bottom = scroller.visible_bottom() + EDGE_TOLERANCE_PX;
    items
        .iter()
        .filter(|i| !i.is_empty() && i.top >= top && i.bottom <= bottom)
        .count()
}

/// At least three rows fully visible
pub fn min_visible_items(scroller: &ScrollerMetrics, items: &[Rect]) -> Result<(), Failure> {
    let visible = fully_visible_items(scroller, items);
    ensure(visible >= MIN_VISIBLE_ITEMS, || {
        Failure::threshold(
            "menu_visible_items",
            format!("only {visible} item(s) fully visible (min {MIN_VISIBLE_ITEMS})"),
        )
        .with("visible", visible)
        .with("items", items.len())
    })
}

/// No horizontal scrolling inside the menu
pub fn no_horizontal_overflow(scroller: &ScrollerMetrics) -> Result<(), Failure> {
    ensure(!scroller.overflows_horizontally(), || {
        Failure::threshold(
            "menu_horizontal_overflow",
            format!(
                "scrollWidth {} exceeds clientWidth {}",
                scroller.scroll_width, scroller.client_width
            ),
        )
        .with("scroll_width", scroller.scroll_width)
        .with("client_width", scroller.client_width)
    })
}

/// No row taller than the median row by more than 6px (text wrapping)
pub fn item_heights_uniform(items: &[Rect]) -> Result<(), Failure> {
    let heights: Vec<f64> = items.iter().map(|i| i.height).collect();
    let med = median(&heights);
    let tallest = heights.iter().copied().fold(0.0, f64::max);
    ensure(tallest <= med + MAX_ITEM_HEIGHT_EXCESS_PX, || {
        let offenders: Vec<usize> = heights
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > med + MAX_ITEM_HEIGHT_EXCESS_PX)
            .map(|(i, _)| i)
            .collect();
        Failure::threshold(
            "menu_item_heights",
            format!(
                "item height {tallest:.1}px exceeds median {med:.1}px by more than {MAX_ITEM_HEIGHT_EXCESS_PX}px (items {offenders:?})"
            ),
        )
        .with("median", med)
        .with("height_spread", spread(heights.iter().copied()))
        .with("offenders", offenders)
    })
}

/// Menu at least as wide as its trigger
pub fn width_covers_trigger(menu: &Rect, trigger: &Rect) -> Result<(), Failure> {
    ensure(menu.width + EDGE_TOLERANCE_PX >= trigger.width, || {
        Failure::threshold(
            "menu_width",
            format!(
                "menu is {:.1}px wide, narrower than its {:.1}px trigger",
                menu.width, trigger.width
            ),
        )
        .with("menu_width", menu.width)
        .with("trigger_width", trigger.width)
    })
}
