//! Test hook bridge.
//!
//! Some checks need to force the UI into a state before measuring it: seed
//! an overflowing events table, reorder rows, trigger a re-render. The UI
//! under test exposes a small set of functions for that. The engine never
//! looks them up on its own; callers hand a [`TestHooks`] to the checks that
//! need one.

use crate::config::CheckConfig;
use crate::page::{evaluate_as, Page};
use crate::result::{CheckError, CheckResult, Failure};
use crate::scripts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Check name used for bridge failures
const BRIDGE_CHECK: &str = "test_hooks";

/// One row of the UI's fixture state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    /// Event identifier (string or number, as the UI emits it)
    pub id: Value,
    /// `current` or `upcoming`
    #[serde(default)]
    pub state: String,
    /// Countdown text or seconds
    #[serde(default)]
    pub countdown: Value,
    /// Everything else the UI keeps on the event
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SnapshotEvent {
    /// Identifier as it appears in a DOM attribute
    #[must_use]
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Fixture state exposed by the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Upcoming and current events in display order
    #[serde(default)]
    pub events: Vec<SnapshotEvent>,
}

/// Control surface the UI exposes for test orchestration
#[async_trait]
pub trait TestHooks: Send + Sync {
    /// Re-render from the current snapshot
    async fn refresh(&self) -> CheckResult<()>;

    /// Seed the upcoming-events table with the given number of rows per impact
    async fn seed_next_events_impact_overflow(
        &self,
        low: usize,
        medium: usize,
        high: usize,
    ) -> CheckResult<()>;

    /// Seed the history list with `count` rows, `high` of them high impact
    async fn seed_history_overflow(&self, count: usize, high: usize) -> CheckResult<()>;

    /// Current fixture state, if the UI has one
    async fn snapshot(&self) -> CheckResult<Option<Snapshot>>;

    /// Replace the events of the fixture state
    async fn set_events(&self, events: &[SnapshotEvent]) -> CheckResult<()>;
}

#[derive(Debug, Deserialize)]
struct HookOutcome {
    ok: bool,
    /// Set by scripts that read their write back
    #[serde(default)]
    applied: Option<bool>,
}

/// [`TestHooks`] backed by functions on `window[namespace]`
#[derive(Debug)]
pub struct PageHooks<'p, P: Page + ?Sized> {
    page: &'p P,
    namespace: String,
}

impl<'p, P: Page + ?Sized> PageHooks<'p, P> {
    /// Hooks under an explicit namespace
    #[must_use]
    pub fn new(page: &'p P, namespace: impl Into<String>) -> Self {
        Self {
            page,
            namespace: namespace.into(),
        }
    }

    /// Hooks under the configured namespace
    #[must_use]
    pub fn from_config(page: &'p P, config: &CheckConfig) -> Self {
        Self::new(page, config.bridge.namespace.clone())
    }

    /// Namespace on `window`
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn unavailable(&self, what: &str) -> CheckError {
        Failure::bridge(
            BRIDGE_CHECK,
            format!("window.{}.{what} is not available", self.namespace),
        )
        .with("namespace", &self.namespace)
        .with("hook", what)
        .into()
    }

    async fn call(&self, name: &str, args: Value) -> CheckResult<()> {
        debug!(namespace = %self.namespace, hook = name, "Calling test hook");
        let outcome: HookOutcome = evaluate_as(
            self.page,
            &scripts::HOOK_CALL,
            json!({ "namespace": self.namespace, "name": name, "args": args }),
        )
        .await?;
        if outcome.ok {
            Ok(())
        } else {
            Err(self.unavailable(name))
        }
    }
}

#[async_trait]
impl<P: Page + ?Sized> TestHooks for PageHooks<'_, P> {
    async fn refresh(&self) -> CheckResult<()> {
        self.call("refresh", json!([])).await
    }

    async fn seed_next_events_impact_overflow(
        &self,
        low: usize,
        medium: usize,
        high: usize,
    ) -> CheckResult<()> {
        self.call("seedNextEventsImpactOverflow", json!([low, medium, high]))
            .await
    }

    async fn seed_history_overflow(&self, count: usize, high: usize) -> CheckResult<()> {
        self.call("seedHistoryOverflow", json!([count, high])).await
    }

    async fn snapshot(&self) -> CheckResult<Option<Snapshot>> {
        evaluate_as(
            self.page,
            &scripts::HOOK_SNAPSHOT,
            json!({ "namespace": self.namespace }),
        )
        .await
    }

    async fn set_events(&self, events: &[SnapshotEvent]) -> CheckResult<()> {
        debug!(namespace = %self.namespace, count = events.len(), "Rewriting snapshot events");
        let outcome: HookOutcome = evaluate_as(
            self.page,
            &scripts::HOOK_SET_EVENTS,
            json!({ "namespace": self.namespace, "events": events }),
        )
        .await?;
        if !outcome.ok {
            return Err(self.unavailable("snapshot"));
        }
        if outcome.applied == Some(false) {
            return Err(Failure::bridge(
                BRIDGE_CHECK,
                format!(
                    "events written through window.{} are missing from a fresh snapshot",
                    self.namespace
                ),
            )
            .with("namespace", &self.namespace)
            .with("hook", "setEvents")
            .into());
        }
        Ok(())
    }
}

/// Fetch the snapshot or fail with a bridge error when it is absent
pub(crate) async fn require_snapshot<H: TestHooks + ?Sized>(
    hooks: &H,
    check: &str,
) -> CheckResult<Snapshot> {
    hooks
        .snapshot()
        .await?
        .ok_or_else(|| Failure::bridge(check, "test hook snapshot unavailable").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MockPage;
    use crate::result::FailureKind;

    fn event(id: &str) -> SnapshotEvent {
        serde_json::from_value(json!({
            "id": id,
            "state": "upcoming",
            "countdown": "2h",
            "impact": "high",
            "cur": "USD"
        }))
        .unwrap()
    }

    mod page_hooks_tests {
        use super::*;

        #[tokio::test]
        async fn test_call_passes_namespace_and_args() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": true }));
            let hooks = PageHooks::new(&page, "__testHooks");

            hooks.seed_next_events_impact_overflow(45, 12, 10).await.unwrap();

            let args = page.args_for(&scripts::HOOK_CALL);
            assert_eq!(args.len(), 1);
            assert_eq!(args[0]["namespace"], "__testHooks");
            assert_eq!(args[0]["name"], "seedNextEventsImpactOverflow");
            assert_eq!(args[0]["args"], json!([45, 12, 10]));
        }

        #[tokio::test]
        async fn test_missing_function_is_bridge_unavailable() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_CALL, json!({ "ok": false }));
            let hooks = PageHooks::from_config(&page, &CheckConfig::default());

            let err = hooks.refresh().await.unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::BridgeUnavailable);
            assert!(failure.message.contains("window.__testHooks.refresh"));
        }

        #[tokio::test]
        async fn test_snapshot_round_trips_extra_fields() {
            let page = MockPage::new();
            page.respond(
                &scripts::HOOK_SNAPSHOT,
                json!({ "events": [
                    { "id": "a", "state": "current", "countdown": 0, "impact": "high" },
                    { "id": 7, "state": "upcoming", "countdown": "3m" }
                ]}),
            );
            let hooks = PageHooks::new(&page, "__testHooks");

            let snapshot = hooks.snapshot().await.unwrap().unwrap();
            assert_eq!(snapshot.events.len(), 2);
            assert_eq!(snapshot.events[0].extra["impact"], "high");
            assert_eq!(snapshot.events[1].id_text(), "7");
        }

        #[tokio::test]
        async fn test_null_snapshot() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_SNAPSHOT, Value::Null);
            let hooks = PageHooks::new(&page, "__testHooks");

            assert!(hooks.snapshot().await.unwrap().is_none());
            let err = require_snapshot(&hooks, "reorder_flip").await.unwrap_err();
            assert_eq!(err.failure().unwrap().check, "reorder_flip");
        }

        #[tokio::test]
        async fn test_set_events_sends_full_events() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_SET_EVENTS, json!({ "ok": true }));
            let hooks = PageHooks::new(&page, "__testHooks");

            hooks.set_events(&[event("b"), event("a")]).await.unwrap();

            let args = page.args_for(&scripts::HOOK_SET_EVENTS);
            assert_eq!(args[0]["events"][0]["id"], "b");
            assert_eq!(args[0]["events"][1]["cur"], "USD");
        }

        #[tokio::test]
        async fn test_set_events_not_applied_fails() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_SET_EVENTS, json!({ "ok": true, "applied": false }));
            let hooks = PageHooks::new(&page, "__testHooks");

            let err = hooks.set_events(&[event("b"), event("a")]).await.unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::BridgeUnavailable);
            assert_eq!(failure.measurement("hook"), Some(&json!("setEvents")));
        }

        #[tokio::test]
        async fn test_set_events_applied() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_SET_EVENTS, json!({ "ok": true, "applied": true }));
            let hooks = PageHooks::new(&page, "__testHooks");
            assert!(hooks.set_events(&[event("a")]).await.is_ok());
            assert!(scripts::HOOK_SET_EVENTS.source.contains("hooks.setEvents"));
        }

        #[tokio::test]
        async fn test_set_events_without_snapshot_fails() {
            let page = MockPage::new();
            page.respond(&scripts::HOOK_SET_EVENTS, json!({ "ok": false }));
            let hooks = PageHooks::new(&page, "__testHooks");

            let err = hooks.set_events(&[event("a")]).await.unwrap_err();
            assert_eq!(
                err.failure().map(|f| f.kind),
                Some(FailureKind::BridgeUnavailable)
            );
        }
    }
}
