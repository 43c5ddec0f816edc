//! Dropdown menu checks.

use super::{with_restore, Inspector};
use crate::page::{evaluate_as, Page, WaitState};
use crate::result::{CheckResult, Failure};
use crate::scripts;
use crate::scroll::{
    boundary_peek, clear_of_footer, evaluate_peek, indicator_is, item_heights_uniform,
    min_visible_items, no_horizontal_overflow, outer_fixed, overscroll_contained,
    width_covers_trigger, within_viewport, MenuMetrics, PeekMeasurement, ScrollEdge,
    ScrollerMetrics, INDICATOR_NONE,
};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    /// Open the dropdown unless it is already visible
    pub async fn open_menu(&self) -> CheckResult<()> {
        const CHECK: &str = "open_menu";
        let menu = &self.config.menu;
        let visible = self
            .page
            .wait_for_selector(&menu.menu, WaitState::Visible, Duration::ZERO)
            .await?;
        if visible {
            return Ok(());
        }
        self.require(CHECK, &menu.trigger).await?;
        debug!(trigger = %menu.trigger, "Opening menu");
        self.page.click(&menu.trigger).await?;
        let opened = self
            .page
            .wait_for_selector(
                &menu.menu,
                WaitState::Visible,
                Duration::from_millis(menu.open_timeout_ms),
            )
            .await?;
        if opened {
            Ok(())
        } else {
            Err(Failure::precondition(
                CHECK,
                format!("{} did not open after clicking {}", menu.menu, menu.trigger),
            )
            .with("timeout_ms", menu.open_timeout_ms)
            .into())
        }
    }

    async fn menu_metrics(&self, check: &str) -> CheckResult<MenuMetrics> {
        let menu = &self.config.menu;
        let metrics: Option<MenuMetrics> = evaluate_as(
            self.page,
            &scripts::MENU_METRICS,
            json!({
                "menu": menu.menu,
                "scroller": menu.scroller,
                "item": menu.item,
                "trigger": menu.trigger,
                "footer": menu.footer,
                "indicatorAttr": menu.indicator_attr,
            }),
        )
        .await?;
        metrics.ok_or_else(|| Failure::precondition(check, format!("{} missing", menu.menu)).into())
    }

    /// Open the menu and measure it
    async fn open_and_measure(&self, check: &str) -> CheckResult<MenuMetrics> {
        self.open_menu().await?;
        self.menu_metrics(check).await
    }

    fn scroller_of<'m>(
        &self,
        check: &str,
        metrics: &'m MenuMetrics,
    ) -> CheckResult<&'m ScrollerMetrics> {
        metrics.scroller.as_ref().ok_or_else(|| {
            Failure::precondition(check, format!("{} missing", self.config.menu.scroller)).into()
        })
    }

    fn overflowing<'m>(
        &self,
        check: &str,
        metrics: &'m MenuMetrics,
    ) -> CheckResult<&'m ScrollerMetrics> {
        let scroller = self.scroller_of(check, metrics)?;
        if scroller.overflows_vertically() {
            Ok(scroller)
        } else {
            Err(Failure::precondition(
                check,
                format!(
                    "menu does not overflow (scrollHeight {} <= clientHeight {})",
                    scroller.scroll_height, scroller.client_height
                ),
            )
            .into())
        }
    }

    /// Move the menu's scroller; returns the previous offset
    async fn scroll_menu(&self, check: &str, to: Value) -> CheckResult<f64> {
        let menu = &self.config.menu;
        let scroller = &menu.scroller;
        let previous: Option<f64> = evaluate_as(
            self.page,
            &scripts::SCROLL_TO,
            json!({ "within": menu.menu, "scroller": scroller, "to": to }),
        )
        .await?;
        previous.ok_or_else(|| Failure::precondition(check, format!("{scroller} missing")).into())
    }

    /// Scroll to `edge` and measure the menu there
    async fn measure_at(&self, check: &str, edge: ScrollEdge) -> CheckResult<MenuMetrics> {
        self.scroll_menu(check, json!(edge.indicator())).await?;
        self.menu_metrics(check).await
    }

    async fn restore_scroll(&self, check: &str, offset: f64) -> CheckResult<()> {
        debug!(check, offset, "Restoring menu scroll position");
        self.scroll_menu(check, json!(offset)).await.map(|_| ())
    }

    fn peek_at(
        &self,
        metrics: &MenuMetrics,
        scroller: &ScrollerMetrics,
        edge: ScrollEdge,
    ) -> Result<PeekMeasurement, Failure> {
        let peek = boundary_peek(scroller, &metrics.items, edge);
        evaluate_peek(&peek, &self.config.peek, edge)?;
        Ok(peek)
    }

    /// After scrolling to `edge`, the row at the opposite edge is partially
    /// visible
    pub async fn menu_peek(&self, edge: ScrollEdge) -> CheckResult<()> {
        const CHECK: &str = "menu_peek";
        debug!(check = CHECK, ?edge, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let original = self.overflowing(CHECK, &metrics)?.scroll_top;
        let body = async {
            let at_edge = self.measure_at(CHECK, edge).await?;
            let scroller = self.scroller_of(CHECK, &at_edge)?;
            let peek = self.peek_at(&at_edge, scroller, edge)?;
            debug!(check = CHECK, clip_px = peek.clip_px, ratio = peek.ratio, "Peek measured");
            CheckResult::Ok(())
        };
        with_restore(CHECK, body, self.restore_scroll(CHECK, original)).await
    }

    /// The indicator attribute reads `top`/`bottom` at the extremes, or
    /// `none` without overflow
    pub async fn menu_scroll_indicator(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_scroll_indicator";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let scroller = self.scroller_of(CHECK, &metrics)?;
        if !scroller.overflows_vertically() {
            return Ok(indicator_is(metrics.indicator.as_deref(), INDICATOR_NONE)?);
        }
        let original = scroller.scroll_top;
        let body = async {
            for edge in [ScrollEdge::Bottom, ScrollEdge::Top] {
                let at_edge = self.measure_at(CHECK, edge).await?;
                indicator_is(at_edge.indicator.as_deref(), edge.indicator())?;
            }
            CheckResult::Ok(())
        };
        with_restore(CHECK, body, self.restore_scroll(CHECK, original)).await
    }

    /// Only the inner list scrolls; the outer menu stays at `scrollTop` 0
    pub async fn menu_outer_fixed(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_outer_fixed";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        outer_fixed(metrics.outer_scroll_top)?;
        let scroller = self.scroller_of(CHECK, &metrics)?;
        if !scroller.overflows_vertically() {
            return Ok(());
        }
        let original = scroller.scroll_top;
        let body = async {
            let at_bottom = self.measure_at(CHECK, ScrollEdge::Bottom).await?;
            CheckResult::Ok(outer_fixed(at_bottom.outer_scroll_top)?)
        };
        with_restore(CHECK, body, self.restore_scroll(CHECK, original)).await
    }

    /// Scrolling the list never chains to the page
    pub async fn menu_overscroll_contained(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_overscroll";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let scroller = self.scroller_of(CHECK, &metrics)?;
        Ok(overscroll_contained(&scroller.overscroll_behavior_y)?)
    }

    /// The menu fits inside the viewport
    pub async fn menu_within_viewport(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_viewport";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        Ok(within_viewport(&metrics.menu, &metrics.viewport)?)
    }

    /// The menu does not cover the fixed footer
    pub async fn menu_clear_of_footer(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_footer";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let footer = metrics.footer.ok_or_else(|| {
            Failure::precondition(CHECK, format!("{} missing", self.config.menu.footer))
        })?;
        Ok(clear_of_footer(&metrics.menu, &footer)?)
    }

    /// At least three rows are fully visible
    pub async fn menu_min_visible_items(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_visible_items";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let scroller = self.scroller_of(CHECK, &metrics)?;
        Ok(min_visible_items(scroller, &metrics.items)?)
    }

    /// No horizontal scrolling inside the menu
    pub async fn menu_no_horizontal_overflow(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_horizontal_overflow";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let scroller = self.scroller_of(CHECK, &metrics)?;
        Ok(no_horizontal_overflow(scroller)?)
    }

    /// No row wraps to a taller height than its siblings
    pub async fn menu_item_heights_uniform(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_item_heights";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        if metrics.items.is_empty() {
            return Err(Failure::precondition(CHECK, format!("{} missing", self.config.menu.item)).into());
        }
        Ok(item_heights_uniform(&metrics.items)?)
    }

    /// The menu is at least as wide as its trigger
    pub async fn menu_width_covers_trigger(&self) -> CheckResult<()> {
        const CHECK: &str = "menu_width";
        debug!(check = CHECK, "Running check");
        let metrics = self.open_and_measure(CHECK).await?;
        let trigger = metrics.trigger.ok_or_else(|| {
            Failure::precondition(CHECK, format!("{} missing", self.config.menu.trigger))
        })?;
        Ok(width_covers_trigger(&metrics.menu, &trigger)?)
    }

    /// Full scroll walk: bottom then top, checking the indicator, the fixed
    /// outer menu and the peek at each extreme. Restores the list's offset.
    pub async fn dropdown_scroll_behavior(&self) -> CheckResult<()> {
        const CHECK: &str = "dropdown_scroll_behavior";
        debug!(check = CHECK, "Running check");
        let relabel = |f: Failure| f.for_check(CHECK);
        let metrics = self.open_and_measure(CHECK).await?;
        outer_fixed(metrics.outer_scroll_top).map_err(relabel)?;
        let original = self.overflowing(CHECK, &metrics)?.scroll_top;

        let body = async {
            for edge in [ScrollEdge::Bottom, ScrollEdge::Top] {
                let at_edge = self.measure_at(CHECK, edge).await?;
                indicator_is(at_edge.indicator.as_deref(), edge.indicator()).map_err(relabel)?;
                outer_fixed(at_edge.outer_scroll_top).map_err(relabel)?;
                let scroller = self.scroller_of(CHECK, &at_edge)?;
                let peek = self.peek_at(&at_edge, scroller, edge).map_err(relabel)?;
                debug!(check = CHECK, ?edge, ratio = peek.ratio, "Extreme verified");
            }
            CheckResult::Ok(())
        };
        with_restore(CHECK, body, self.restore_scroll(CHECK, original)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::rect_json;
    use crate::page::MockPage;
    use crate::result::FailureKind;

    const ITEM_H: f64 = 40.0;
    const TOP: f64 = 100.0;
    /// Five full rows plus a 60% peek of the sixth
    const CLIENT_H: f64 = 5.0 * ITEM_H + 24.0;

    /// Dropdown with `items` rows scrolled to `scroll_top`
    fn dropdown(items: usize, scroll_top: f64, indicator: &str) -> Value {
        let rows: Vec<Value> = (0..items)
            .map(|i| rect_json(20.0, TOP + i as f64 * ITEM_H - scroll_top, 200.0, ITEM_H))
            .collect();
        json!({
            "viewport": { "width": 1280, "height": 800 },
            "menu": rect_json(20.0, TOP, 200.0, CLIENT_H),
            "outerScrollTop": 0,
            "indicator": indicator,
            "scroller": {
                "rect": rect_json(20.0, TOP, 200.0, CLIENT_H),
                "scrollTop": scroll_top,
                "scrollHeight": items as f64 * ITEM_H,
                "clientHeight": CLIENT_H,
                "clientTop": 0,
                "scrollWidth": 200,
                "clientWidth": 200,
                "overscrollBehaviorY": "contain"
            },
            "items": rows,
            "trigger": rect_json(20.0, 60.0, 180.0, 32.0),
            "footer": rect_json(0.0, 760.0, 1280.0, 40.0)
        })
    }

    fn bottom_offset(items: usize) -> f64 {
        items as f64 * ITEM_H - CLIENT_H
    }

    fn open_page() -> MockPage {
        let page = MockPage::new();
        page.set_count(".dropdown-menu", 1);
        page.respond(&scripts::SCROLL_TO, json!(0));
        page
    }

    mod open_tests {
        use super::*;

        #[tokio::test]
        async fn test_visible_menu_is_not_clicked() {
            let page = open_page();
            Inspector::new(&page).open_menu().await.unwrap();
            assert!(!page.was_called("click:"));
        }

        #[tokio::test]
        async fn test_hidden_menu_is_opened_through_trigger() {
            let page = MockPage::new();
            page.set_count(".dropdown-trigger", 1);
            let err = Inspector::new(&page).open_menu().await.unwrap_err();
            assert!(page.was_called("click:.dropdown-trigger"));
            assert!(err.failure().unwrap().message.contains("did not open"));
        }

        #[tokio::test]
        async fn test_missing_trigger() {
            let page = MockPage::new();
            let err = Inspector::new(&page).open_menu().await.unwrap_err();
            assert_eq!(err.failure().unwrap().message, ".dropdown-trigger missing");
        }
    }

    mod peek_tests {
        use super::*;

        #[tokio::test]
        async fn test_peek_at_both_extremes() {
            for edge in [ScrollEdge::Top, ScrollEdge::Bottom] {
                let page = open_page();
                page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
                let offset = if edge == ScrollEdge::Top { 0.0 } else { bottom_offset(20) };
                page.respond(&scripts::MENU_METRICS, dropdown(20, offset, edge.indicator()));
                Inspector::new(&page).menu_peek(edge).await.unwrap();

                let scrolls = page.args_for(&scripts::SCROLL_TO);
                assert_eq!(scrolls[0]["to"], edge.indicator());
                assert_eq!(scrolls.last().unwrap()["to"], 0.0);
            }
        }

        #[tokio::test]
        async fn test_hard_cut_fails() {
            let page = open_page();
            let mut metrics = dropdown(20, 0.0, "top");
            metrics["scroller"]["clientHeight"] = json!(200.0);
            page.respond(&scripts::MENU_METRICS, metrics);
            let err = Inspector::new(&page).menu_peek(ScrollEdge::Top).await.unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.check, "menu_peek");
            assert!(failure.message.contains("clipped 0.0px"));
            // restored even though the check failed
            assert_eq!(page.calls("evaluate:scroll_to"), 2);
        }

        #[tokio::test]
        async fn test_short_menu_has_nothing_to_peek() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(3, 0.0, "none"));
            let err = Inspector::new(&page).menu_peek(ScrollEdge::Top).await.unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::Precondition);
            assert!(!page.was_called("evaluate:scroll_to"));
        }
    }

    mod indicator_tests {
        use super::*;

        #[tokio::test]
        async fn test_indicator_tracks_extremes() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, bottom_offset(20), "bottom"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            Inspector::new(&page).menu_scroll_indicator().await.unwrap();
        }

        #[tokio::test]
        async fn test_stale_indicator_fails() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, bottom_offset(20), "top"));
            let err = Inspector::new(&page).menu_scroll_indicator().await.unwrap_err();
            assert_eq!(err.failure().unwrap().check, "menu_scroll_indicator");
        }

        #[tokio::test]
        async fn test_no_overflow_expects_none() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(3, 0.0, "none"));
            Inspector::new(&page).menu_scroll_indicator().await.unwrap();
            assert!(!page.was_called("evaluate:scroll_to"));
        }
    }

    mod geometry_tests {
        use super::*;

        #[tokio::test]
        async fn test_static_menu_checks_pass() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            let inspector = Inspector::new(&page);
            inspector.menu_overscroll_contained().await.unwrap();
            inspector.menu_within_viewport().await.unwrap();
            inspector.menu_clear_of_footer().await.unwrap();
            inspector.menu_min_visible_items().await.unwrap();
            inspector.menu_no_horizontal_overflow().await.unwrap();
            inspector.menu_item_heights_uniform().await.unwrap();
            inspector.menu_width_covers_trigger().await.unwrap();
            inspector.menu_outer_fixed().await.unwrap();
        }

        #[tokio::test]
        async fn test_menu_narrower_than_trigger() {
            let page = open_page();
            let mut metrics = dropdown(20, 0.0, "top");
            metrics["trigger"] = rect_json(20.0, 60.0, 260.0, 32.0);
            page.respond(&scripts::MENU_METRICS, metrics);
            let err = Inspector::new(&page).menu_width_covers_trigger().await.unwrap_err();
            assert_eq!(err.failure().unwrap().check, "menu_width");
        }

        #[tokio::test]
        async fn test_scroll_chaining_fails() {
            let page = open_page();
            let mut metrics = dropdown(20, 0.0, "top");
            metrics["scroller"]["overscrollBehaviorY"] = json!("auto");
            page.respond(&scripts::MENU_METRICS, metrics);
            assert!(Inspector::new(&page).menu_overscroll_contained().await.is_err());
        }

        #[tokio::test]
        async fn test_missing_footer_is_precondition() {
            let page = open_page();
            let mut metrics = dropdown(20, 0.0, "top");
            metrics["footer"] = Value::Null;
            page.respond(&scripts::MENU_METRICS, metrics);
            let err = Inspector::new(&page).menu_clear_of_footer().await.unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::Precondition);
        }

        #[tokio::test]
        async fn test_outer_menu_scrolled() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            let mut scrolled = dropdown(20, bottom_offset(20), "bottom");
            scrolled["outerScrollTop"] = json!(12);
            page.respond(&scripts::MENU_METRICS, scrolled);
            let err = Inspector::new(&page).menu_outer_fixed().await.unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.measurement("outer_scroll_top"), Some(&json!(12.0)));
        }
    }

    mod behavior_tests {
        use super::*;

        #[tokio::test]
        async fn test_dropdown_scroll_behavior() {
            let page = open_page();
            page.respond(&scripts::SCROLL_TO, json!(0));
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, bottom_offset(20), "bottom"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            Inspector::new(&page).dropdown_scroll_behavior().await.unwrap();

            let targets: Vec<Value> = page
                .args_for(&scripts::SCROLL_TO)
                .into_iter()
                .map(|a| a["to"].clone())
                .collect();
            assert_eq!(targets, vec![json!("bottom"), json!("top"), json!(0.0)]);
            // scrolls the list inside the open menu, not the first match on the page
            assert!(page
                .args_for(&scripts::SCROLL_TO)
                .iter()
                .all(|a| a["within"] == ".dropdown-menu" && a["scroller"] == ".dropdown-scroll"));
        }

        #[tokio::test]
        async fn test_step_failures_name_the_walk() {
            let page = open_page();
            let mut drifted = dropdown(20, bottom_offset(20), "bottom");
            drifted["outerScrollTop"] = json!(4.0);
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            page.respond(&scripts::MENU_METRICS, drifted);
            let err = Inspector::new(&page)
                .dropdown_scroll_behavior()
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.check, "dropdown_scroll_behavior");
            assert_eq!(failure.measurement("step"), Some(&json!("menu_outer_fixed")));
            assert_eq!(page.args_for(&scripts::SCROLL_TO).last().unwrap()["to"], 0.0);
        }

        #[tokio::test]
        async fn test_wrong_indicator_names_the_walk() {
            let page = open_page();
            page.respond(&scripts::MENU_METRICS, dropdown(20, 0.0, "top"));
            page.respond(&scripts::MENU_METRICS, dropdown(20, bottom_offset(20), "top"));
            let err = Inspector::new(&page)
                .dropdown_scroll_behavior()
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.check, "dropdown_scroll_behavior");
            assert_eq!(failure.measurement("step"), Some(&json!("menu_scroll_indicator")));
        }
    }
}
