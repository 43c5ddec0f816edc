//! Fixture-driven checks: the impact filter and the history list.

use super::{settle, Inspector};
use crate::bridge::TestHooks;
use crate::page::{evaluate_as, Page};
use crate::result::{CheckResult, Failure};
use crate::scripts;
use crate::scroll::{no_horizontal_overflow, overscroll_contained, ScrollerMetrics};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Seeded low/medium/high upcoming events
pub const IMPACT_SEED: (usize, usize, usize) = (45, 12, 10);

/// Seeded history rows and how many of them are high impact
pub const HISTORY_SEED: (usize, usize) = (60, 15);

/// High-impact rows that must stay visible once low and medium are filtered out
pub const MIN_HIGH_ROWS: usize = 8;

/// Levels switched off to isolate high-impact rows
const FILTERED_LEVELS: [&str; 2] = ["low", "medium"];

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    /// Wait until at least one `selector` is rendered
    async fn wait_for_rows(&self, check: &str, selector: &str) -> CheckResult<()> {
        let timeout_ms = self.config.events.render_timeout_ms;
        let rendered = self
            .page
            .wait_for_function(
                &scripts::MIN_COUNT,
                json!({ "selector": selector, "min": 1 }),
                Duration::from_millis(timeout_ms),
            )
            .await?;
        if rendered {
            Ok(())
        } else {
            Err(Failure::precondition(
                check,
                format!("{selector} did not render within {timeout_ms}ms"),
            )
            .with("timeout_ms", timeout_ms)
            .into())
        }
    }

    /// Whether `toggle` reports itself switched on
    async fn toggle_active(&self, check: &str, toggle: &str) -> CheckResult<bool> {
        let active: Option<bool> =
            evaluate_as(self.page, &scripts::TOGGLE_STATE, json!({ "selector": toggle })).await?;
        active.ok_or_else(|| {
            Failure::precondition(check, format!("{toggle} missing"))
                .with("selector", toggle)
                .into()
        })
    }

    /// Require every toggle in `toggles` to report `expected`
    async fn require_toggles(
        &self,
        check: &str,
        toggles: &[String],
        expected: bool,
    ) -> CheckResult<()> {
        for toggle in toggles {
            let active = self.toggle_active(check, toggle).await?;
            if active != expected {
                let state = if expected { "inactive" } else { "active" };
                return Err(
                    Failure::threshold(check, format!("{toggle} still {state} after click"))
                        .with("selector", toggle.as_str())
                        .with("active", active)
                        .into(),
                );
            }
        }
        Ok(())
    }

    /// Switch off whichever of the low and medium filters are on, recording
    /// every toggle clicked, then require only high-impact rows on screen
    async fn narrow_to_high(&self, check: &str, toggled: &mut Vec<String>) -> CheckResult<()> {
        let events = &self.config.events;
        for level in FILTERED_LEVELS {
            let toggle = events.toggle_for(level);
            self.require(check, &toggle).await?;
            if !self.toggle_active(check, &toggle).await? {
                debug!(check, toggle = %toggle, "Filter already off");
                continue;
            }
            self.page.click(&toggle).await?;
            toggled.push(toggle);
        }
        self.page.wait_for_timeout(self.config.settle_ms).await;
        self.require_toggles(check, toggled, false).await?;

        let high = self.visible_count(&events.high_row).await?;
        let total = self.visible_count(&events.row).await?;
        debug!(check, high, total, "Filtered rows counted");
        if high < MIN_HIGH_ROWS {
            return Err(Failure::threshold(
                check,
                format!("{high} high-impact row(s) visible after filtering (min {MIN_HIGH_ROWS})"),
            )
            .with("high", high)
            .with("total", total)
            .into());
        }
        if total != high {
            return Err(Failure::threshold(
                check,
                format!("{} non-high row(s) still visible after filtering", total.saturating_sub(high)),
            )
            .with("high", high)
            .with("total", total)
            .into());
        }
        Ok(())
    }

    /// Click the toggles this check switched off, require them on again and
    /// the original row count back
    async fn reactivate(&self, check: &str, toggled: &[String], original: usize) -> CheckResult<()> {
        debug!(check, toggles = toggled.len(), "Re-enabling impact filters");
        for toggle in toggled {
            self.page.click(toggle).await?;
        }
        self.page.wait_for_timeout(self.config.settle_ms).await;
        self.require_toggles(check, toggled, true).await?;
        let restored = self.visible_count(&self.config.events.row).await?;
        if restored == original {
            Ok(())
        } else {
            Err(Failure::threshold(
                check,
                format!("{restored} row(s) visible after re-enabling filters, expected {original}"),
            )
            .with("restored", restored)
            .with("original", original)
            .into())
        }
    }

    /// Seed a crowded upcoming-events list, filter it down to high impact
    /// and back again
    pub async fn impact_filters_narrow(&self, hooks: &dyn TestHooks) -> CheckResult<()> {
        const CHECK: &str = "impact_filters";
        debug!(check = CHECK, "Running check");
        let (low, medium, high) = IMPACT_SEED;
        hooks.seed_next_events_impact_overflow(low, medium, high).await?;
        let row = &self.config.events.row;
        self.wait_for_rows(CHECK, row).await?;
        let original = self.visible_count(row).await?;

        let mut toggled = Vec::new();
        let outcome = self.narrow_to_high(CHECK, &mut toggled).await;
        let restored = self.reactivate(CHECK, &toggled, original).await;
        settle(CHECK, outcome, restored)
    }

    /// Seed an overflowing history list and require it to scroll cleanly
    pub async fn history_overflow_scrolls(&self, hooks: &dyn TestHooks) -> CheckResult<()> {
        const CHECK: &str = "history_overflow";
        debug!(check = CHECK, "Running check");
        let (count, high) = HISTORY_SEED;
        hooks.seed_history_overflow(count, high).await?;
        let history = &self.config.history;
        self.wait_for_rows(CHECK, &history.row).await?;

        let metrics: Option<ScrollerMetrics> = evaluate_as(
            self.page,
            &scripts::SCROLL_METRICS,
            json!({ "scroller": history.scroller }),
        )
        .await?;
        let metrics = metrics.ok_or_else(|| {
            Failure::precondition(CHECK, format!("{} missing", history.scroller))
        })?;
        if !metrics.overflows_vertically() {
            return Err(Failure::threshold(
                CHECK,
                format!(
                    "history list does not scroll (scrollHeight {} <= clientHeight {})",
                    metrics.scroll_height, metrics.client_height
                ),
            )
            .with("scroll_height", metrics.scroll_height)
            .with("client_height", metrics.client_height)
            .into());
        }
        overscroll_contained(&metrics.overscroll_behavior_y).map_err(|f| f.for_check(CHECK))?;
        no_horizontal_overflow(&metrics).map_err(|f| f.for_check(CHECK))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::PageHooks;
    use crate::checks::test_support::rect_json;
    use crate::page::MockPage;
    use crate::result::FailureKind;
    use serde_json::Value;

    const LOW: &str = r#"[data-impact-filter="low"]"#;
    const MEDIUM: &str = r#"[data-impact-filter="medium"]"#;

    /// Both filters on, off after the first clicks and on again after the second
    fn filter_page() -> MockPage {
        let page = MockPage::new();
        page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
        page.set_count(LOW, 1);
        page.set_count(MEDIUM, 1);
        toggle_states(&page, &[true, true, false, false, true]);
        page
    }

    /// Toggle states in read order
    fn toggle_states(page: &MockPage, states: &[bool]) {
        for state in states {
            page.respond(&scripts::TOGGLE_STATE, json!(state));
        }
    }

    /// Visible counts in call order: original, high, total, restored
    fn counts(page: &MockPage, values: &[usize]) {
        for v in values {
            page.respond(&scripts::VISIBLE_COUNT, json!(v));
        }
    }

    fn history_metrics(scroll_height: f64, behavior: &str, scroll_width: f64) -> Value {
        json!({
            "rect": rect_json(0.0, 300.0, 400.0, 320.0),
            "scrollTop": 0,
            "scrollHeight": scroll_height,
            "clientHeight": 320,
            "clientTop": 0,
            "scrollWidth": scroll_width,
            "clientWidth": 400,
            "overscrollBehaviorY": behavior
        })
    }

    mod impact_tests {
        use super::*;

        #[tokio::test]
        async fn test_filters_narrow_and_restore() {
            let page = filter_page();
            counts(&page, &[67, 10, 10, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            Inspector::new(&page).impact_filters_narrow(&hooks).await.unwrap();

            let seed = &page.args_for(&scripts::HOOK_CALL)[0];
            assert_eq!(seed["name"], "seedNextEventsImpactOverflow");
            assert_eq!(seed["args"], json!([45, 12, 10]));
            assert_eq!(page.calls(&format!("click:{LOW}")), 2);
            assert_eq!(page.calls(&format!("click:{MEDIUM}")), 2);
        }

        #[tokio::test]
        async fn test_stray_rows_fail_but_filters_come_back() {
            let page = filter_page();
            counts(&page, &[67, 10, 14, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.message, "4 non-high row(s) still visible after filtering");
            assert_eq!(page.calls(&format!("click:{LOW}")), 2);
        }

        #[tokio::test]
        async fn test_too_few_high_rows() {
            let page = filter_page();
            counts(&page, &[67, 5, 5, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert_eq!(err.failure().unwrap().measurement("high"), Some(&json!(5)));
        }

        #[tokio::test]
        async fn test_only_clicked_toggles_are_restored() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
            page.set_count(LOW, 1);
            toggle_states(&page, &[true]);
            counts(&page, &[67, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::Precondition);
            assert_eq!(page.calls(&format!("click:{LOW}")), 2);
            assert!(!page.was_called(&format!("click:{MEDIUM}")));
        }

        #[tokio::test]
        async fn test_inactive_filter_is_left_alone() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
            page.set_count(LOW, 1);
            page.set_count(MEDIUM, 1);
            // low already off; medium on, off, on again
            toggle_states(&page, &[false, true, false, true]);
            counts(&page, &[67, 10, 10, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            Inspector::new(&page).impact_filters_narrow(&hooks).await.unwrap();

            assert!(!page.was_called(&format!("click:{LOW}")));
            assert_eq!(page.calls(&format!("click:{MEDIUM}")), 2);
            let read: Vec<Value> = page
                .args_for(&scripts::TOGGLE_STATE)
                .into_iter()
                .map(|a| a["selector"].clone())
                .collect();
            assert_eq!(read, vec![json!(LOW), json!(MEDIUM), json!(MEDIUM), json!(MEDIUM)]);
        }

        #[tokio::test]
        async fn test_toggle_ignoring_click_fails() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
            page.set_count(LOW, 1);
            page.set_count(MEDIUM, 1);
            toggle_states(&page, &[true]);
            counts(&page, &[67, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::Threshold);
            assert_eq!(failure.message, format!("{LOW} still active after click"));
            assert_eq!(failure.measurement("active"), Some(&json!(true)));
            assert_eq!(page.calls(&format!("click:{LOW}")), 2);
        }

        #[tokio::test]
        async fn test_filter_not_switched_back_on() {
            let page = filter_page();
            // medium stays off after the second click
            toggle_states(&page, &[false]);
            counts(&page, &[67, 10, 10, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert_eq!(
                err.failure().unwrap().message,
                format!("{MEDIUM} still inactive after click")
            );
        }

        #[tokio::test]
        async fn test_missing_toggle_state() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
            page.set_count(LOW, 1);
            page.respond(&scripts::TOGGLE_STATE, Value::Null);
            counts(&page, &[67, 67]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::Precondition);
            assert_eq!(failure.message, format!("{LOW} missing"));
            assert!(!page.was_called("click:"));
        }

        #[tokio::test]
        async fn test_count_not_restored() {
            let page = filter_page();
            counts(&page, &[67, 10, 10, 55]);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert!(err.failure().unwrap().message.contains("expected 67"));
        }

        #[tokio::test]
        async fn test_rows_never_render() {
            let page = filter_page();
            page.respond(&scripts::MIN_COUNT, json!(false));
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert!(err.failure().unwrap().message.contains("did not render within 5000ms"));
            assert!(!page.was_called("click:"));
        }

        #[tokio::test]
        async fn test_missing_seed_hook() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": false }));
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .impact_filters_narrow(&hooks)
                .await
                .unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::BridgeUnavailable);
        }
    }

    mod history_tests {
        use super::*;

        #[tokio::test]
        async fn test_history_scrolls() {
            let page = filter_page();
            page.respond(&scripts::SCROLL_METRICS, history_metrics(2400.0, "contain", 400.0));
            let hooks = PageHooks::new(&page, "__testHooks");
            Inspector::new(&page).history_overflow_scrolls(&hooks).await.unwrap();
            let seed = &page.args_for(&scripts::HOOK_CALL)[0];
            assert_eq!(seed["args"], json!([60, 15]));
        }

        #[tokio::test]
        async fn test_history_without_overflow() {
            let page = filter_page();
            page.respond(&scripts::SCROLL_METRICS, history_metrics(320.0, "contain", 400.0));
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .history_overflow_scrolls(&hooks)
                .await
                .unwrap_err();
            assert!(err.failure().unwrap().message.starts_with("history list does not scroll"));
        }

        #[tokio::test]
        async fn test_history_failures_name_history_check() {
            let page = filter_page();
            page.respond(&scripts::SCROLL_METRICS, history_metrics(2400.0, "auto", 400.0));
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .history_overflow_scrolls(&hooks)
                .await
                .unwrap_err();
            assert_eq!(err.failure().unwrap().check, "history_overflow");

            let page = filter_page();
            page.respond(&scripts::SCROLL_METRICS, history_metrics(2400.0, "contain", 460.0));
            let hooks = PageHooks::new(&page, "__testHooks");
            assert!(Inspector::new(&page).history_overflow_scrolls(&hooks).await.is_err());
        }

        #[tokio::test]
        async fn test_missing_scroller() {
            let page = filter_page();
            page.respond(&scripts::SCROLL_METRICS, Value::Null);
            let hooks = PageHooks::new(&page, "__testHooks");
            let err = Inspector::new(&page)
                .history_overflow_scrolls(&hooks)
                .await
                .unwrap_err();
            assert_eq!(err.failure().unwrap().message, "#history .history-list missing");
        }
    }
}
