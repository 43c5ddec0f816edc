//! Page - Abstract Browser Collaborator Trait
//!
//! The engine never drives a browser directly. Everything it needs from the
//! automation layer goes through [`Page`]: run a script in page context,
//! count and measure elements, hover and click, and wait.
//!
//! ```text
//! ┌──────────────┐   evaluate / count / click / wait   ┌──────────────────┐
//! │  Inspector   │ ──────────────────────────────────► │  dyn Page        │
//! │  (checks)    │ ◄────────────────────────────────── │  ChromiumPage    │
//! └──────────────┘        JSON values, rects           │  MockPage        │
//!                                                      └──────────────────┘
//! ```
//!
//! Implementations:
//!
//! - `ChromiumPage` - CDP via chromiumoxide (feature `browser`)
//! - [`MockPage`] - scripted responses for unit tests

use crate::geometry::Rect;
use crate::result::{CheckError, CheckResult};
use crate::scripts::Script;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Element state to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    /// Present in the DOM
    #[default]
    Attached,
    /// Removed from the DOM
    Detached,
    /// Present with a non-empty box
    Visible,
    /// Absent or without a box
    Hidden,
}

impl WaitState {
    /// Name as used in logs and mock responses
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// Browser automation surface consumed by the engine
///
/// All methods are request/response round-trips to a single-threaded page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Call `script` (a JS function expression) with `arg` in page context.
    /// Promises are awaited; the JSON-serializable result is returned.
    async fn evaluate(&self, script: &Script, arg: Value) -> CheckResult<Value>;

    /// Number of elements matching `selector`
    async fn count(&self, selector: &str) -> CheckResult<usize>;

    /// Bounding box of the `nth` match, `None` if absent
    async fn bounding_box(&self, selector: &str, nth: usize) -> CheckResult<Option<Rect>>;

    /// Move the pointer over the first match
    async fn hover(&self, selector: &str) -> CheckResult<()>;

    /// Click the first match
    async fn click(&self, selector: &str) -> CheckResult<()>;

    /// Sleep
    async fn wait_for_timeout(&self, ms: u64);

    /// Wait for `selector` to reach `state`; `false` on timeout
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> CheckResult<bool>;

    /// Poll `predicate(arg)` until truthy; `false` on timeout (never an error)
    async fn wait_for_function(
        &self,
        predicate: &Script,
        arg: Value,
        timeout: Duration,
    ) -> CheckResult<bool>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> CheckResult<Vec<u8>>;
}

/// Evaluate `script` and deserialize its result
pub async fn evaluate_as<T, P>(page: &P, script: &Script, arg: Value) -> CheckResult<T>
where
    T: DeserializeOwned,
    P: Page + ?Sized,
{
    let value = page.evaluate(script, arg).await?;
    serde_json::from_value(value).map_err(|e| CheckError::Script {
        script: script.name.to_string(),
        message: format!("unexpected result shape: {e}"),
    })
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, VecDeque<Value>>,
    counts: HashMap<String, VecDeque<usize>>,
    boxes: HashMap<String, Vec<Rect>>,
    args: HashMap<String, Vec<Value>>,
    screenshot: Vec<u8>,
    call_history: Vec<String>,
}

/// Mock page for unit testing
///
/// Responses are queued per script name and per selector. A queue hands out
/// its values in order and then keeps repeating the last one, so a single
/// `respond` call models a page whose state never changes.
#[derive(Debug, Default)]
pub struct MockPage {
    state: Mutex<MockState>,
}

fn next_from<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl MockPage {
    /// Create new mock page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a result for `script`
    pub fn respond(&self, script: &Script, value: Value) -> &Self {
        self.lock()
            .responses
            .entry(script.name.to_string())
            .or_default()
            .push_back(value);
        self
    }

    /// Queue a match count for `selector`
    pub fn set_count(&self, selector: &str, count: usize) -> &Self {
        self.lock()
            .counts
            .entry(selector.to_string())
            .or_default()
            .push_back(count);
        self
    }

    /// Set the boxes returned for `selector`
    pub fn set_boxes(&self, selector: &str, boxes: Vec<Rect>) -> &Self {
        self.lock().boxes.insert(selector.to_string(), boxes);
        self
    }

    /// Set screenshot bytes
    pub fn set_screenshot(&self, png: Vec<u8>) -> &Self {
        self.lock().screenshot = png;
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    /// Check if a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().call_history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of calls starting with `prefix`
    #[must_use]
    pub fn calls(&self, prefix: &str) -> usize {
        self.lock()
            .call_history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Arguments passed to `script`, in call order
    #[must_use]
    pub fn args_for(&self, script: &Script) -> Vec<Value> {
        self.lock().args.get(script.name).cloned().unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.lock().call_history.push(call);
    }
}

#[async_trait]
impl Page for MockPage {
    async fn evaluate(&self, script: &Script, arg: Value) -> CheckResult<Value> {
        let mut state = self.lock();
        state.call_history.push(format!("evaluate:{}", script.name));
        state
            .args
            .entry(script.name.to_string())
            .or_default()
            .push(arg);
        state
            .responses
            .get_mut(script.name)
            .and_then(next_from)
            .ok_or_else(|| CheckError::Script {
                script: script.name.to_string(),
                message: "No mock response set".to_string(),
            })
    }

    async fn count(&self, selector: &str) -> CheckResult<usize> {
        let mut state = self.lock();
        state.call_history.push(format!("count:{selector}"));
        Ok(state.counts.get_mut(selector).and_then(next_from).unwrap_or(0))
    }

    async fn bounding_box(&self, selector: &str, nth: usize) -> CheckResult<Option<Rect>> {
        let state = self.lock();
        Ok(state.boxes.get(selector).and_then(|b| b.get(nth)).copied())
    }

    async fn hover(&self, selector: &str) -> CheckResult<()> {
        self.record(format!("hover:{selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> CheckResult<()> {
        self.record(format!("click:{selector}"));
        Ok(())
    }

    async fn wait_for_timeout(&self, ms: u64) {
        self.record(format!("wait:{ms}"));
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        _timeout: Duration,
    ) -> CheckResult<bool> {
        let mut guard = self.lock();
        guard
            .call_history
            .push(format!("wait_for_selector:{selector}:{}", state.as_str()));
        let present = guard
            .counts
            .get_mut(selector)
            .and_then(next_from)
            .unwrap_or(0)
            > 0;
        Ok(match state {
            WaitState::Attached | WaitState::Visible => present,
            WaitState::Detached | WaitState::Hidden => !present,
        })
    }

    async fn wait_for_function(
        &self,
        predicate: &Script,
        arg: Value,
        _timeout: Duration,
    ) -> CheckResult<bool> {
        let mut state = self.lock();
        state
            .call_history
            .push(format!("wait_for_function:{}", predicate.name));
        state
            .args
            .entry(predicate.name.to_string())
            .or_default()
            .push(arg);
        Ok(state
            .responses
            .get_mut(predicate.name)
            .and_then(next_from)
            .map_or(true, |v| v.as_bool().unwrap_or(false)))
    }

    async fn screenshot(&self) -> CheckResult<Vec<u8>> {
        let state = self.lock();
        if state.screenshot.is_empty() {
            Err(CheckError::Page {
                message: "No mock screenshot set".to_string(),
            })
        } else {
            Ok(state.screenshot.clone())
        }
    }
}
