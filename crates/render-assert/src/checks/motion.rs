//! Motion checks: declared transitions, sampled interpolation, spinners and
//! FLIP reorders.

use super::{read_style, with_restore, Inspector};
use crate::bridge::{require_snapshot, TestHooks};
use crate::page::{evaluate_as, Page, WaitState};
use crate::result::{CheckResult, Failure};
use crate::sampler::{
    is_identity_transform, max_declared_duration_ms, sample_until, transitions_transform, Change,
    SamplePlan, SampleSeries, StyleSample,
};
use crate::scripts;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// How long a spinner may take to appear
pub const SPINNER_APPEAR_TIMEOUT: Duration = Duration::from_secs(6);

/// Animation frames sampled after a reorder
pub const FLIP_FRAMES: usize = 12;

/// Present samples required by two-point comparisons
const MIN_PRESENT: usize = 2;

/// Present samples required for spinner and FLIP judgments
const MIN_PRESENT_SUSTAINED: usize = 3;

/// Properties that give visible hover feedback
const HOVER_PROPS: &[&str] = &["background-color", "box-shadow", "transform", "color"];

/// Interaction that starts an animation before sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger<'a> {
    /// Sample as-is
    None,
    /// Click this selector first
    Click(&'a str),
    /// Hover this selector first
    Hover(&'a str),
}

/// Per-frame reading taken in page context during a reorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    /// Computed `transform`
    pub transform: String,
    /// Computed `transition-property`
    pub transition_property: String,
    /// Computed `transition-duration`
    pub transition_duration: String,
}

impl FrameSample {
    /// Whether this frame shows a transform transition in flight
    #[must_use]
    pub fn transitions_transform(&self) -> bool {
        transitions_transform(&self.transition_property, &self.transition_duration)
    }
}

fn require_change<T: PartialEq + Serialize>(
    series: &SampleSeries<T>,
    check: &str,
    what: String,
) -> Result<(), Failure> {
    if series.classify() == Change::Changed {
        return Ok(());
    }
    let first = series.present().next();
    Err(Failure::threshold(check, format!("{what} did not change across {} samples", series.present_count()))
        .with("samples", series.samples().len())
        .with("value", first))
}

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    async fn declared(&self, check: &str, selector: &str, props: &[&str]) -> CheckResult<StyleSample> {
        self.read_style(selector, props).await?.ok_or_else(|| {
            Failure::precondition(check, format!("{selector} missing"))
                .with("selector", selector)
                .into()
        })
    }

    /// `transition-duration` declares something longer than 0
    pub async fn transition_declared(&self, selector: &str) -> CheckResult<()> {
        const CHECK: &str = "transition_declared";
        debug!(check = CHECK, selector, "Running check");
        let style = self
            .declared(CHECK, selector, &["transition-duration", "transition-property"])
            .await?;
        let durations = style.get("transition-duration").map_or("", String::as_str);
        let max = max_declared_duration_ms(durations);
        if max > 0.0 {
            return Ok(());
        }
        Err(Failure::threshold(
            CHECK,
            format!("{selector} declares no transition (transition-duration: {durations:?})"),
        )
        .with("selector", selector)
        .with("style", &style)
        .into())
    }

    /// A named animation with a duration longer than 0
    pub async fn animation_declared(&self, selector: &str) -> CheckResult<()> {
        const CHECK: &str = "animation_declared";
        debug!(check = CHECK, selector, "Running check");
        let style = self
            .declared(CHECK, selector, &["animation-duration", "animation-name"])
            .await?;
        let name = style.get("animation-name").map_or("", String::as_str).trim();
        let durations = style.get("animation-duration").map_or("", String::as_str);
        let max = max_declared_duration_ms(durations);
        if max > 0.0 && !name.is_empty() && name != "none" {
            return Ok(());
        }
        Err(Failure::threshold(
            CHECK,
            format!("{selector} declares no animation (animation-name: {name:?}, animation-duration: {durations:?})"),
        )
        .with("selector", selector)
        .with("style", &style)
        .into())
    }

    pub(super) async fn fire(&self, trigger: Trigger<'_>) -> CheckResult<()> {
        match trigger {
            Trigger::None => Ok(()),
            Trigger::Click(selector) => self.page.click(selector).await,
            Trigger::Hover(selector) => self.page.hover(selector).await,
        }
    }

    async fn sample_props(
        &self,
        check: &str,
        selector: &str,
        props: &'static [&'static str],
        plan: &SamplePlan,
    ) -> CheckResult<SampleSeries<StyleSample>> {
        let page = self.page;
        let series = sample_until(page, plan, move |_| read_style(page, selector, props)).await?;
        series.require_present(MIN_PRESENT, check)?;
        Ok(series)
    }

    /// Computed `opacity` interpolates after `trigger`
    pub async fn opacity_animates(&self, selector: &str, trigger: Trigger<'_>) -> CheckResult<()> {
        const CHECK: &str = "opacity_animates";
        debug!(check = CHECK, selector, ?trigger, "Running check");
        self.require(CHECK, selector).await?;
        self.fire(trigger).await?;
        let series = self
            .sample_props(CHECK, selector, &["opacity"], &SamplePlan::MOTION)
            .await?;
        require_change(&series, CHECK, format!("{selector} opacity"))?;
        Ok(())
    }

    /// Computed `transform` interpolates after `trigger`
    pub async fn transform_animates(&self, selector: &str, trigger: Trigger<'_>) -> CheckResult<()> {
        const CHECK: &str = "transform_animates";
        debug!(check = CHECK, selector, ?trigger, "Running check");
        self.require(CHECK, selector).await?;
        self.fire(trigger).await?;
        let series = self
            .sample_props(CHECK, selector, &["transform"], &SamplePlan::MOTION)
            .await?;
        require_change(&series, CHECK, format!("{selector} transform"))?;
        Ok(())
    }

    /// Hovering changes background, shadow, transform or color over time
    pub async fn hover_feedback_animates(&self, selector: &str) -> CheckResult<()> {
        const CHECK: &str = "hover_feedback";
        debug!(check = CHECK, selector, "Running check");
        self.require(CHECK, selector).await?;
        self.page.hover(selector).await?;
        let series = self
            .sample_props(CHECK, selector, HOVER_PROPS, &SamplePlan::MOTION)
            .await?;
        require_change(&series, CHECK, format!("{selector} hover feedback"))?;
        Ok(())
    }

    /// A spinner's transform keeps moving and is not stuck at identity
    pub async fn spinner_animates(&self, selector: &str) -> CheckResult<()> {
        const CHECK: &str = "spinner_animates";
        debug!(check = CHECK, selector, "Running check");
        let appeared = self
            .page
            .wait_for_selector(selector, WaitState::Attached, SPINNER_APPEAR_TIMEOUT)
            .await?;
        if !appeared {
            return Err(Failure::precondition(CHECK, format!("spinner {selector} missing"))
                .with("selector", selector)
                .with("waited_ms", SPINNER_APPEAR_TIMEOUT.as_millis() as u64)
                .into());
        }

        let page = self.page;
        let series =
            sample_until(page, &SamplePlan::SPINNER, move |_| read_transform(page, selector)).await?;
        series.require_present(MIN_PRESENT_SUSTAINED, CHECK)?;
        require_change(&series, CHECK, format!("spinner {selector} transform"))?;

        if series.present().all(|t| is_identity_transform(t)) {
            return Err(Failure::threshold(
                CHECK,
                format!("spinner {selector} never left the identity transform"),
            )
            .with("samples", series.present().collect::<Vec<_>>())
            .into());
        }
        Ok(())
    }

    /// After a reorder through `hooks`, the moved row animates with a
    /// transform transition instead of jumping
    pub async fn reorder_flip(&self, hooks: &dyn TestHooks) -> CheckResult<()> {
        const CHECK: &str = "reorder_flip";
        debug!(check = CHECK, "Running check");
        let snapshot = require_snapshot(hooks, CHECK).await?;
        let original = snapshot.events;
        if original.len() < 2 {
            return Err(Failure::bridge(CHECK, "snapshot needs at least two events to reorder")
                .with("events", original.len())
                .into());
        }

        let mut reordered = original.clone();
        let last = reordered.len() - 1;
        reordered.swap(0, last);
        let moved = self.config.events.row_with_id(&reordered[0].id_text());

        let body = async {
            hooks.set_events(&reordered).await?;
            hooks.refresh().await?;
            let frames: Vec<Option<FrameSample>> = evaluate_as(
                self.page,
                &scripts::FRAME_SAMPLES,
                json!({ "selector": moved, "frames": FLIP_FRAMES }),
            )
            .await?;
            judge_flip(&SampleSeries::from_observations(frames), &moved)
        };
        let restore = async {
            debug!(check = CHECK, events = original.len(), "Restoring event order");
            hooks.set_events(&original).await?;
            hooks.refresh().await
        };
        with_restore(CHECK, body, restore).await
    }
}

async fn read_transform<P: Page + ?Sized>(page: &P, selector: &str) -> CheckResult<Option<String>> {
    let style = read_style(page, selector, &["transform"]).await?;
    Ok(style.and_then(|mut s| s.remove("transform")))
}

/// Judge a reorder: a displaced frame and an active transform transition
fn judge_flip(series: &SampleSeries<FrameSample>, selector: &str) -> CheckResult<()> {
    const CHECK: &str = "reorder_flip";
    series.require_present(MIN_PRESENT_SUSTAINED, CHECK)?;
    let displaced = series.present().any(|f| !is_identity_transform(&f.transform));
    let transitioning = series.present().any(FrameSample::transitions_transform);
    if displaced && transitioning {
        return Ok(());
    }
    let mut missing = Vec::new();
    if !displaced {
        missing.push("no non-identity transform");
    }
    if !transitioning {
        missing.push("no transform transition");
    }
    Err(Failure::threshold(
        CHECK,
        format!(
            "{selector} reordered without a FLIP animation: {} across {} frames",
            missing.join(" and "),
            series.samples().len()
        ),
    )
    .with("displaced", displaced)
    .with("transitioning", transitioning)
    .with("frames", series.samples())
    .into())
}
