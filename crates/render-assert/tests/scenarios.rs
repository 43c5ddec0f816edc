//! End-to-end scenarios against a scripted page.

use render_assert::scripts;
use render_assert::{CheckConfig, FailureKind, Inspector, MockPage, PageHooks, Rect, ScrollEdge};
use serde_json::{json, Value};

const ITEM_H: f64 = 36.0;
const MENU_TOP: f64 = 120.0;
const ITEMS: usize = 20;
/// Five full rows plus half of the sixth
const CLIENT_H: f64 = 5.0 * ITEM_H + 18.0;

fn rect(left: f64, top: f64, width: f64, height: f64) -> Value {
    json!(Rect::new(left, top, width, height))
}

fn dropdown(scroll_top: f64, indicator: &str, outer_scroll_top: f64) -> Value {
    let items: Vec<Value> = (0..ITEMS)
        .map(|i| rect(40.0, MENU_TOP + i as f64 * ITEM_H - scroll_top, 240.0, ITEM_H))
        .collect();
    json!({
        "viewport": { "width": 1280, "height": 720 },
        "menu": rect(40.0, MENU_TOP, 240.0, CLIENT_H),
        "outerScrollTop": outer_scroll_top,
        "indicator": indicator,
        "scroller": {
            "rect": rect(40.0, MENU_TOP, 240.0, CLIENT_H),
            "scrollTop": scroll_top,
            "scrollHeight": ITEMS as f64 * ITEM_H,
            "clientHeight": CLIENT_H,
            "clientTop": 0,
            "scrollWidth": 240,
            "clientWidth": 240,
            "overscrollBehaviorY": "contain"
        },
        "items": items,
        "trigger": rect(40.0, 84.0, 200.0, 32.0),
        "footer": rect(0.0, 680.0, 1280.0, 40.0)
    })
}

fn bottom() -> f64 {
    ITEMS as f64 * ITEM_H - CLIENT_H
}

/// Menu closed until the trigger is clicked
fn dropdown_page() -> MockPage {
    let page = MockPage::new();
    page.set_count(".dropdown-trigger", 1);
    page.set_count(".dropdown-menu", 0);
    page.set_count(".dropdown-menu", 1);
    page.respond(&scripts::SCROLL_TO, json!(0));
    page
}

#[tokio::test]
async fn dropdown_walks_bottom_then_top_with_fixed_outer_menu() {
    let page = dropdown_page();
    page.respond(&scripts::MENU_METRICS, dropdown(0.0, "top", 0.0));
    page.respond(&scripts::MENU_METRICS, dropdown(bottom(), "bottom", 0.0));
    page.respond(&scripts::MENU_METRICS, dropdown(0.0, "top", 0.0));

    let inspector = Inspector::new(&page);
    inspector.dropdown_scroll_behavior().await.unwrap();

    assert!(page.was_called("click:.dropdown-trigger"));
    let targets: Vec<Value> = page
        .args_for(&scripts::SCROLL_TO)
        .into_iter()
        .map(|arg| arg["to"].clone())
        .collect();
    assert_eq!(targets, vec![json!("bottom"), json!("top"), json!(0.0)]);
}

#[tokio::test]
async fn dropdown_outer_menu_drift_is_reported() {
    let page = dropdown_page();
    page.respond(&scripts::MENU_METRICS, dropdown(0.0, "top", 0.0));
    page.respond(&scripts::MENU_METRICS, dropdown(bottom(), "bottom", 3.0));

    let err = Inspector::new(&page)
        .dropdown_scroll_behavior()
        .await
        .unwrap_err();
    let failure = err.failure().unwrap();
    assert_eq!(failure.check, "dropdown_scroll_behavior");
    assert_eq!(failure.measurement("step"), Some(&json!("menu_outer_fixed")));
    assert_eq!(failure.kind, FailureKind::Threshold);
    // the list is put back where it started
    assert_eq!(page.args_for(&scripts::SCROLL_TO).last().unwrap()["to"], 0.0);
}

#[tokio::test]
async fn dropdown_peek_respects_configured_tolerance() {
    let page = dropdown_page();
    page.respond(&scripts::MENU_METRICS, dropdown(0.0, "top", 0.0));

    let yaml = "peek:\n  minRatio: 0.6\n  maxRatio: 0.9\n";
    let config = CheckConfig::from_yaml_str(yaml).unwrap();
    let err = Inspector::with_config(&page, config)
        .menu_peek(ScrollEdge::Top)
        .await
        .unwrap_err();
    assert_eq!(err.failure().unwrap().check, "menu_peek");
}

#[tokio::test]
async fn impact_filters_leave_only_high_rows_and_restore() {
    let page = MockPage::new();
    page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
    page.set_count(r#"[data-impact-filter="low"]"#, 1);
    page.set_count(r#"[data-impact-filter="medium"]"#, 1);
    // both filters on, switched off, then back on
    for active in [true, true, false, false, true] {
        page.respond(&scripts::TOGGLE_STATE, json!(active));
    }
    // all rows, high rows after filtering, all rows after filtering, restored
    for count in [67, 10, 10, 67] {
        page.respond(&scripts::VISIBLE_COUNT, json!(count));
    }

    let hooks = PageHooks::new(&page, "__testHooks");
    Inspector::new(&page)
        .impact_filters_narrow(&hooks)
        .await
        .unwrap();

    let calls = page.args_for(&scripts::HOOK_CALL);
    assert_eq!(calls[0]["name"], "seedNextEventsImpactOverflow");
    assert_eq!(calls[0]["args"], json!([45, 12, 10]));
    assert_eq!(
        page.calls(r#"click:[data-impact-filter="low"]"#),
        2,
        "low filter switched off and back on"
    );
    assert_eq!(page.calls(r#"click:[data-impact-filter="medium"]"#), 2);
}

#[tokio::test]
async fn impact_filters_report_missing_bridge() {
    let page = MockPage::new();
    page.respond(&scripts::HOOK_CALL, json!({ "ok": false }));
    let hooks = PageHooks::new(&page, "__testHooks");

    let err = Inspector::new(&page)
        .impact_filters_narrow(&hooks)
        .await
        .unwrap_err();
    assert_eq!(err.failure().unwrap().kind, FailureKind::BridgeUnavailable);
    assert!(!page.was_called("click:"));
}
