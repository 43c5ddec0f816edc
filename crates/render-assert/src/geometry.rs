//! Bounding boxes and tolerance-based layout comparisons.
//!
//! Tolerances are fixed per comparison and inclusive: a 2px tolerance
//! accepts a 2px delta and rejects 3px. Boxes are always read fresh from
//! the page; nothing here caches geometry across waits.

use crate::result::{ensure, Failure};
use serde::{Deserialize, Serialize};

/// Maximum spread of bottom edges in a baseline-aligned row
pub const BASELINE_TOLERANCE_PX: f64 = 2.0;

/// Minimum horizontal gap between left-sorted siblings in a row
pub const MIN_SIBLING_GAP_PX: f64 = 8.0;

/// Maximum spread of vertical centers for controls sharing a row
pub const CENTER_TOLERANCE_PX: f64 = 3.0;

/// Maximum height change across a triggered state change
pub const LAYOUT_SHIFT_TOLERANCE_PX: f64 = 2.0;

/// Maximum overhang of a child past any parent edge
pub const OVERFLOW_TOLERANCE_PX: f64 = 1.0;

/// Maximum right-edge, width, and height spread across repeated rows
pub const COLUMN_TOLERANCE_PX: f64 = 2.0;

/// Minimum gap between a section title and its first control
pub const MIN_TITLE_GAP_PX: f64 = 8.0;

/// Minimum gap between consecutive sections
pub const MIN_SECTION_GAP_PX: f64 = 12.0;

/// Slack for float noise in comparisons against whole-pixel tolerances
const EPS: f64 = 1e-6;

/// Element bounding box in viewport pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub left: f64,
    /// Right edge
    pub right: f64,
    /// Top edge
    pub top: f64,
    /// Bottom edge
    pub bottom: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create from origin and size
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            right: left + width,
            top,
            bottom: top + height,
            width,
            height,
        }
    }

    /// Vertical center
    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Whether the box has any area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Whether two boxes overlap with positive area
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Largest overhang of `self` past any edge of `outer` (0 if inside)
    #[must_use]
    pub fn overhang(&self, outer: &Self) -> f64 {
        [
            outer.left - self.left,
            self.right - outer.right,
            outer.top - self.top,
            self.bottom - outer.bottom,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }
}

/// `max - min` of a sequence (0 for an empty one)
#[must_use]
pub fn spread(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() {
        max - min
    } else {
        0.0
    }
}

fn within(delta: f64, tolerance: f64) -> bool {
    delta <= tolerance + EPS
}

fn at_least(value: f64, minimum: f64) -> bool {
    value + EPS >= minimum
}

fn require_count(check: &str, what: &str, rects: &[Rect], min: usize) -> Result<(), Failure> {
    ensure(rects.len() >= min, || {
        Failure::precondition(check, format!("{what} missing: need {min}, found {}", rects.len()))
            .with("count", rects.len())
    })
}

/// Bottom edges within 2px and left-sorted siblings at least 8px apart
pub fn baseline_aligned(rects: &[Rect]) -> Result<(), Failure> {
    const CHECK: &str = "baseline_alignment";
    require_count(CHECK, "row items", rects, 2)?;

    let bottoms: Vec<f64> = rects.iter().map(|r| r.bottom).collect();
    let delta = spread(bottoms.iter().copied());
    ensure(within(delta, BASELINE_TOLERANCE_PX), || {
        Failure::threshold(
            CHECK,
            format!("bottom edges drift by {delta:.1}px (max {BASELINE_TOLERANCE_PX}px)"),
        )
        .with("bottoms", &bottoms)
        .with("delta", delta)
    })?;

    let mut sorted = rects.to_vec();
    sorted.sort_by(|a, b| a.left.total_cmp(&b.left));
    for (i, pair) in sorted.windows(2).enumerate() {
        let gap = pair[1].left - pair[0].right;
        ensure(at_least(gap, MIN_SIBLING_GAP_PX), || {
            Failure::threshold(
                CHECK,
                format!(
                    "gap between items {i} and {} is {gap:.1}px (min {MIN_SIBLING_GAP_PX}px)",
                    i + 1
                ),
            )
            .with("gap", gap)
            .with("left", pair[0])
            .with("right", pair[1])
        })?;
    }
    Ok(())
}

/// Vertical centers within 3px
pub fn vertically_centered(rects: &[Rect]) -> Result<(), Failure> {
    const CHECK: &str = "vertical_centering";
    require_count(CHECK, "controls", rects, 2)?;
    let centers: Vec<f64> = rects.iter().map(Rect::center_y).collect();
    let delta = spread(centers.iter().copied());
    ensure(within(delta, CENTER_TOLERANCE_PX), || {
        Failure::threshold(
            CHECK,
            format!("vertical centers drift by {delta:.1}px (max {CENTER_TOLERANCE_PX}px)"),
        )
        .with("centers", &centers)
        .with("delta", delta)
    })
}

/// Height change across a state change within 2px
pub fn layout_stable(before: f64, after: f64) -> Result<(), Failure> {
    let delta = (after - before).abs();
    ensure(within(delta, LAYOUT_SHIFT_TOLERANCE_PX), || {
        Failure::threshold(
            "layout_shift",
            format!(
                "height changed {before:.1}px -> {after:.1}px ({delta:.1}px, max {LAYOUT_SHIFT_TOLERANCE_PX}px)"
            ),
        )
        .with("before", before)
        .with("after", after)
        .with("delta", delta)
    })
}

/// Child stays inside parent, 1px slack on every edge
pub fn contained(child: &Rect, parent: &Rect) -> Result<(), Failure> {
    let overhang = child.overhang(parent);
    ensure(within(overhang, OVERFLOW_TOLERANCE_PX), || {
        Failure::threshold(
            "overflow_containment",
            format!("child overflows parent by {overhang:.1}px (max {OVERFLOW_TOLERANCE_PX}px)"),
        )
        .with("child", child)
        .with("parent", parent)
        .with("overhang", overhang)
    })
}

/// Repeated button rows line up column by column and share one button size
pub fn columns_aligned(rows: &[Vec<Rect>]) -> Result<(), Failure> {
    const CHECK: &str = "column_alignment";
    ensure(rows.len() >= 2, || {
        Failure::precondition(CHECK, format!("action rows missing: found {}", rows.len()))
    })?;
    let columns = rows[0].len();
    ensure(columns > 0, || Failure::precondition(CHECK, "action buttons missing"))?;
    let counts: Vec<usize> = rows.iter().map(Vec::len).collect();
    ensure(counts.iter().all(|&c| c == columns), || {
        Failure::threshold(CHECK, "rows have different button counts").with("counts", &counts)
    })?;

    for col in 0..columns {
        let rights: Vec<f64> = rows.iter().map(|r| r[col].right).collect();
        let widths: Vec<f64> = rows.iter().map(|r| r[col].width).collect();
        let right_delta = spread(rights.iter().copied());
        let width_delta = spread(widths.iter().copied());
        ensure(within(right_delta, COLUMN_TOLERANCE_PX), || {
            Failure::threshold(
                CHECK,
                format!("column {col} right edges drift by {right_delta:.1}px (max {COLUMN_TOLERANCE_PX}px)"),
            )
            .with("column", col)
            .with("rights", &rights)
        })?;
        ensure(within(width_delta, COLUMN_TOLERANCE_PX), || {
            Failure::threshold(
                CHECK,
                format!("column {col} widths drift by {width_delta:.1}px (max {COLUMN_TOLERANCE_PX}px)"),
            )
            .with("column", col)
            .with("widths", &widths)
        })?;
    }

    let all: Vec<&Rect> = rows.iter().flatten().collect();
    let width_delta = spread(all.iter().map(|r| r.width));
    let height_delta = spread(all.iter().map(|r| r.height));
    ensure(
        within(width_delta, COLUMN_TOLERANCE_PX) && within(height_delta, COLUMN_TOLERANCE_PX),
        || {
            Failure::threshold(
                CHECK,
                format!(
                    "button sizes differ by {width_delta:.1}px wide, {height_delta:.1}px tall (max {COLUMN_TOLERANCE_PX}px)"
                ),
            )
            .with("width_delta", width_delta)
            .with("height_delta", height_delta)
        },
    )
}

/// One settings section: its box, its title, and its first control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBoxes {
    /// Section container
    pub section: Rect,
    /// Section title
    pub title: Rect,
    /// First control under the title
    pub first_control: Rect,
}

/// Title-to-control gap of at least 8px, section-to-section gap of at least 12px
pub fn section_rhythm(sections: &[SectionBoxes]) -> Result<(), Failure> {
    const CHECK: &str = "section_rhythm";
    ensure(!sections.is_empty(), || Failure::precondition(CHECK, "sections missing"))?;
    for (i, s) in sections.iter().enumerate() {
        let gap = s.first_control.top - s.title.bottom;
        ensure(at_least(gap, MIN_TITLE_GAP_PX), || {
            Failure::threshold(
                CHECK,
                format!("section {i} title-to-control gap is {gap:.1}px (min {MIN_TITLE_GAP_PX}px)"),
            )
            .with("section", i)
            .with("gap", gap)
        })?;
    }
    let mut ordered: Vec<&SectionBoxes> = sections.iter().collect();
    ordered.sort_by(|a, b| a.section.top.total_cmp(&b.section.top));
    for (i, pair) in ordered.windows(2).enumerate() {
        let gap = pair[1].section.top - pair[0].section.bottom;
        ensure(at_least(gap, MIN_SECTION_GAP_PX), || {
            Failure::threshold(
                CHECK,
                format!(
                    "gap between sections {i} and {} is {gap:.1}px (min {MIN_SECTION_GAP_PX}px)",
                    i + 1
                ),
            )
            .with("gap", gap)
        })?;
    }
    Ok(())
}

/// Horizontal overflow report for one text label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOverflow {
    /// Short description of the label
    pub label: String,
    /// `scrollWidth`
    pub scroll_width: f64,
    /// `clientWidth`
    pub client_width: f64,
    /// Computed `text-overflow`
    #[serde(default)]
    pub text_overflow: String,
}

impl LabelOverflow {
    /// Clipped without an ellipsis to signal it
    #[must_use]
    pub fn is_clipped(&self) -> bool {
        self.scroll_width > self.client_width + OVERFLOW_TOLERANCE_PX
            && self.text_overflow.trim() != "ellipsis"
    }
}

/// No label is cut off without an ellipsis
pub fn labels_unclipped(labels: &[LabelOverflow]) -> Result<(), Failure> {
    let clipped: Vec<&LabelOverflow> = labels.iter().filter(|l| l.is_clipped()).collect();
    ensure(clipped.is_empty(), || {
        let names: Vec<String> = clipped
            .iter()
            .map(|l| format!("{} ({}>{})", l.label, l.scroll_width, l.client_width))
            .collect();
        Failure::threshold(
            "text_clipping",
            format!("{} label(s) clipped: {}", clipped.len(), names.join(", ")),
        )
        .with("clipped", &clipped)
    })
}
