//! Layout checks over element boxes.

use super::motion::Trigger;
use super::Inspector;
use crate::geometry::{self, LabelOverflow, Rect, SectionBoxes};
use crate::page::{evaluate_as, Page};
use crate::result::{CheckResult, Failure};
use crate::scripts;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SectionScan {
    sections: Vec<SectionBoxes>,
    #[serde(default)]
    incomplete: usize,
}

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    /// Boxes of every match, failing with a precondition when there are none
    async fn require_rects(&self, check: &str, selector: &str) -> CheckResult<Vec<Rect>> {
        let rects = self.rects(selector).await?;
        if rects.is_empty() {
            return Err(Failure::precondition(check, format!("{selector} missing"))
                .with("selector", selector)
                .into());
        }
        Ok(rects)
    }

    /// Items in a row share a baseline and keep their spacing
    pub async fn baseline_aligned(&self, selector: &str) -> CheckResult<()> {
        debug!(check = "baseline_alignment", selector, "Running check");
        let rects = self.rects(selector).await?;
        Ok(geometry::baseline_aligned(&rects)?)
    }

    /// Controls in a row share a vertical center
    pub async fn controls_centered(&self, selector: &str) -> CheckResult<()> {
        debug!(check = "vertical_centering", selector, "Running check");
        let rects = self.rects(selector).await?;
        Ok(geometry::vertically_centered(&rects)?)
    }

    /// The element keeps its height across `trigger`.
    ///
    /// Measures, fires the trigger, waits the configured settle time and
    /// measures again.
    pub async fn no_layout_shift(&self, selector: &str, trigger: Trigger<'_>) -> CheckResult<()> {
        const CHECK: &str = "layout_shift";
        debug!(check = CHECK, selector, ?trigger, "Running check");
        let before = self.require_rects(CHECK, selector).await?[0].height;
        self.fire(trigger).await?;
        self.page.wait_for_timeout(self.config.settle_ms).await;
        let after = self.require_rects(CHECK, selector).await?[0].height;
        debug!(check = CHECK, before, after, "Heights measured");
        Ok(geometry::layout_stable(before, after)?)
    }

    /// `child` does not spill out of `parent`
    pub async fn contained(&self, child: &str, parent: &str) -> CheckResult<()> {
        const CHECK: &str = "overflow_containment";
        debug!(check = CHECK, child, parent, "Running check");
        let parent_box = self.rect(CHECK, parent).await?;
        let child_box = self.rect(CHECK, child).await?;
        Ok(geometry::contained(&child_box, &parent_box)?)
    }

    /// Button columns line up across repeated rows
    pub async fn action_columns_aligned(&self, row: &str, button: &str) -> CheckResult<()> {
        debug!(check = "column_alignment", row, button, "Running check");
        let rows: Vec<Vec<Rect>> =
            evaluate_as(self.page, &scripts::ROW_BUTTONS, json!({ "row": row, "button": button }))
                .await?;
        Ok(geometry::columns_aligned(&rows)?)
    }

    /// Titles sit clear of their controls and sections clear of each other
    pub async fn section_rhythm(&self, section: &str, title: &str, control: &str) -> CheckResult<()> {
        const CHECK: &str = "section_rhythm";
        debug!(check = CHECK, section, "Running check");
        let scan: SectionScan = evaluate_as(
            self.page,
            &scripts::SECTION_BOXES,
            json!({ "section": section, "title": title, "control": control }),
        )
        .await?;
        if scan.incomplete > 0 {
            return Err(Failure::precondition(
                CHECK,
                format!("{} section(s) missing {title} or {control}", scan.incomplete),
            )
            .with("incomplete", scan.incomplete)
            .into());
        }
        Ok(geometry::section_rhythm(&scan.sections)?)
    }

    /// No label is cut off without an ellipsis
    pub async fn labels_unclipped(&self, selector: &str) -> CheckResult<()> {
        debug!(check = "text_clipping", selector, "Running check");
        let labels: Vec<LabelOverflow> =
            evaluate_as(self.page, &scripts::LABEL_OVERFLOW, json!({ "selector": selector })).await?;
        Ok(geometry::labels_unclipped(&labels)?)
    }
}
