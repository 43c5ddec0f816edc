//! [`Page`] over a real Chromium tab via the Chrome DevTools Protocol.
//!
//! Only compiled with the `browser` feature.

use crate::geometry::Rect;
use crate::page::{Page, WaitState};
use crate::result::{CheckError, CheckResult};
use crate::scripts::{self, Script};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Interval between condition polls
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Launch options
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable in containers)
    pub sandbox: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl LaunchOptions {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

fn page_error(e: impl std::fmt::Display) -> CheckError {
    CheckError::Page {
        message: e.to_string(),
    }
}

/// Running Chromium instance
#[derive(Debug)]
pub struct ChromiumBrowser {
    inner: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium
    pub async fn launch(options: LaunchOptions) -> CheckResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(options.viewport_width, options.viewport_height);
        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(page_error)?;

        let (browser, mut handler) = CdpBrowser::launch(config).await.map_err(page_error)?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!(headless = options.headless, "Launched chromium");

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Open a tab at `url`
    pub async fn open(&self, url: &str) -> CheckResult<ChromiumPage> {
        let browser = self.inner.lock().await;
        let page = browser.new_page(url).await.map_err(page_error)?;
        page.wait_for_navigation().await.map_err(page_error)?;
        Ok(ChromiumPage::new(page))
    }

    /// Close the browser
    pub async fn close(self) -> CheckResult<()> {
        let mut browser = self.inner.lock().await;
        browser.close().await.map_err(page_error)?;
        self.handle.abort();
        Ok(())
    }
}

/// Chromium tab implementing [`Page`]
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    inner: Arc<Mutex<CdpPage>>,
}

impl ChromiumPage {
    /// Wrap an existing chromiumoxide page
    #[must_use]
    pub fn new(page: CdpPage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(page)),
        }
    }

    /// Navigate to `url` and wait for the load
    pub async fn goto(&self, url: &str) -> CheckResult<()> {
        let page = self.inner.lock().await;
        page.goto(url).await.map_err(page_error)?;
        Ok(())
    }

    async fn poll(&self, script: &Script, arg: Value, timeout: Duration) -> CheckResult<bool> {
        let started = Instant::now();
        loop {
            if self.evaluate(script, arg.clone()).await?.as_bool() == Some(true) {
                return Ok(true);
            }
            if started.elapsed() >= timeout {
                debug!(script = script.name, timeout_ms = timeout.as_millis() as u64, "Poll timed out");
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn evaluate(&self, script: &Script, arg: Value) -> CheckResult<Value> {
        let expression = script.invocation(&arg.to_string());
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|message| CheckError::Script {
                script: script.name.to_string(),
                message,
            })?;
        let page = self.inner.lock().await;
        let result = page
            .evaluate_expression(params)
            .await
            .map_err(|e| CheckError::Script {
                script: script.name.to_string(),
                message: e.to_string(),
            })?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn count(&self, selector: &str) -> CheckResult<usize> {
        let value = self
            .evaluate(&scripts::COUNT, json!({ "selector": selector }))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn bounding_box(&self, selector: &str, nth: usize) -> CheckResult<Option<Rect>> {
        let value = self
            .evaluate(&scripts::RECT_AT, json!({ "selector": selector, "nth": nth }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn hover(&self, selector: &str) -> CheckResult<()> {
        let page = self.inner.lock().await;
        let element = page.find_element(selector).await.map_err(page_error)?;
        element.hover().await.map_err(page_error)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> CheckResult<()> {
        let page = self.inner.lock().await;
        let element = page.find_element(selector).await.map_err(page_error)?;
        element.click().await.map_err(page_error)?;
        Ok(())
    }

    async fn wait_for_timeout(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> CheckResult<bool> {
        self.poll(
            &scripts::SELECTOR_STATE,
            json!({ "selector": selector, "state": state.as_str() }),
            timeout,
        )
        .await
    }

    async fn wait_for_function(
        &self,
        predicate: &Script,
        arg: Value,
        timeout: Duration,
    ) -> CheckResult<bool> {
        self.poll(predicate, arg, timeout).await
    }

    async fn screenshot(&self) -> CheckResult<Vec<u8>> {
        use base64::Engine;

        let page = self.inner.lock().await;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = page.execute(params).await.map_err(page_error)?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(page_error)
    }
}
