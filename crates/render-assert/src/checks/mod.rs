//! Assertion catalog.
//!
//! Every check is a method on [`Inspector`]. A check reads the DOM state it
//! needs in as few round-trips as possible, fails with a precondition when a
//! required element is absent, optionally drives the UI into a state through
//! [`TestHooks`](crate::bridge::TestHooks), and compares the measurements
//! against fixed thresholds. Checks that change UI state put it back on
//! every path before returning.
//!
//! ```ignore
//! let inspector = Inspector::new(&page);
//! inspector.text_contrast("main").await?;
//! inspector.menu_peek(ScrollEdge::Bottom).await?;
//! ```

mod contrast;
mod filters;
mod layout;
mod menu;
mod motion;

pub use contrast::{ColorSample, ContrastPair, ContrastReport};
pub use filters::{HISTORY_SEED, IMPACT_SEED, MIN_HIGH_ROWS};
pub use motion::{FrameSample, Trigger, FLIP_FRAMES, SPINNER_APPEAR_TIMEOUT};

use crate::bridge::PageHooks;
use crate::config::CheckConfig;
use crate::geometry::Rect;
use crate::page::{evaluate_as, Page};
use crate::result::{CheckResult, Failure};
use crate::sampler::StyleSample;
use crate::scripts;
use serde_json::json;
use std::future::Future;
use tracing::warn;

/// Runs checks against one page
#[derive(Debug)]
pub struct Inspector<'p, P: Page + ?Sized> {
    page: &'p P,
    config: CheckConfig,
}

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    /// Inspector with the default configuration
    #[must_use]
    pub fn new(page: &'p P) -> Self {
        Self::with_config(page, CheckConfig::default())
    }

    /// Inspector with an explicit configuration
    #[must_use]
    pub const fn with_config(page: &'p P, config: CheckConfig) -> Self {
        Self { page, config }
    }

    /// Page under inspection
    #[must_use]
    pub const fn page(&self) -> &'p P {
        self.page
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Test hooks on this page under the configured namespace
    #[must_use]
    pub fn page_hooks(&self) -> PageHooks<'p, P> {
        PageHooks::from_config(self.page, &self.config)
    }

    /// Fail with a precondition unless `selector` matches something
    pub(crate) async fn require(&self, check: &str, selector: &str) -> CheckResult<()> {
        let count = self.page.count(selector).await?;
        if count == 0 {
            return Err(Failure::precondition(check, format!("{selector} missing"))
                .with("selector", selector)
                .into());
        }
        Ok(())
    }

    /// First box of `selector`, or a precondition failure
    pub(crate) async fn rect(&self, check: &str, selector: &str) -> CheckResult<Rect> {
        self.page.bounding_box(selector, 0).await?.ok_or_else(|| {
            Failure::precondition(check, format!("{selector} missing"))
                .with("selector", selector)
                .into()
        })
    }

    /// Boxes of every match
    pub(crate) async fn rects(&self, selector: &str) -> CheckResult<Vec<Rect>> {
        evaluate_as(self.page, &scripts::RECTS, json!({ "selector": selector })).await
    }

    /// Matches with a visible box
    pub(crate) async fn visible_count(&self, selector: &str) -> CheckResult<usize> {
        evaluate_as(self.page, &scripts::VISIBLE_COUNT, json!({ "selector": selector })).await
    }

    /// Computed style properties of the first match
    pub(crate) async fn read_style(
        &self,
        selector: &str,
        props: &[&str],
    ) -> CheckResult<Option<StyleSample>> {
        read_style(self.page, selector, props).await
    }
}

/// Computed style properties of the first match of `selector`
pub(crate) async fn read_style<P: Page + ?Sized>(
    page: &P,
    selector: &str,
    props: &[&str],
) -> CheckResult<Option<StyleSample>> {
    evaluate_as(
        page,
        &scripts::READ_STYLE,
        json!({ "selector": selector, "props": props }),
    )
    .await
}

/// Run `body`, then `restore` whatever happened. A failure from `body` wins
/// over a failure from `restore`.
pub(crate) async fn with_restore<T>(
    check: &str,
    body: impl Future<Output = CheckResult<T>>,
    restore: impl Future<Output = CheckResult<()>>,
) -> CheckResult<T> {
    let outcome = body.await;
    let restored = restore.await;
    settle(check, outcome, restored)
}

/// Combine a check's outcome with the outcome of putting the UI back
pub(crate) fn settle<T>(
    check: &str,
    outcome: CheckResult<T>,
    restored: CheckResult<()>,
) -> CheckResult<T> {
    match (outcome, restored) {
        (Err(e), Err(restore_err)) => {
            warn!(check, error = %restore_err, "Restoring UI state failed after check failure");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (Ok(value), Ok(())) => Ok(value),
    }
}
