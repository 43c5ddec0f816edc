//! render-assert: visual and behavioral assertions for rendered web UIs.
//!
//! Checks run against a live page through the [`Page`] trait and decide
//! whether the rendered result meets fixed perceptual thresholds: text
//! contrast, animated transitions, dropdown scroll behavior and layout
//! geometry. UI states that are hard to reach by clicking are set up
//! through an explicitly passed [`TestHooks`] handle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   render-assert Architecture                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Inspector  │    │ Page       │    │ Headless   │            │
//! │   │ (checks)   │───►│ (trait)    │───►│ Browser    │            │
//! │   │            │    │ + scripts  │    │ (chromium) │            │
//! │   └─────┬──────┘    └────────────┘    └────────────┘            │
//! │         │ measurements                                          │
//! │   ┌─────▼──────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ color      │    │ sampler    │    │ scroll     │            │
//! │   │ background │    │            │    │ geometry   │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use render_assert::{Inspector, ScrollEdge};
//!
//! let page = browser.open("http://localhost:8080").await?;
//! let inspector = Inspector::new(&page);
//! inspector.text_contrast("main").await?;
//! inspector.dropdown_scroll_behavior().await?;
//! inspector.impact_filters_narrow(&inspector.page_hooks()).await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Background resolution through the ancestor chain
pub mod background;

/// Fixture seeding through in-page test hooks
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod bridge;

/// Screenshot and filmstrip capture for report generation
pub mod artifacts;

/// Real browser page over the Chrome DevTools Protocol
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod chromium;

mod checks;

/// Color parsing, luminance and contrast
pub mod color;

/// Check configuration
pub mod config;

/// Box geometry tolerances
#[allow(clippy::missing_errors_doc)]
pub mod geometry;

/// Log subscriber setup
pub mod logging;

/// Browser page abstraction and its mock
#[allow(clippy::missing_errors_doc)]
pub mod page;

mod result;

/// Temporal sampling of computed styles
pub mod sampler;

/// In-page measurement scripts
pub mod scripts;

/// Scroll and clip evaluation for dropdown menus
#[allow(clippy::missing_errors_doc)]
pub mod scroll;

pub use artifacts::{ArtifactLog, Capture, CaptureMedia, CaptureTarget, Recorder};
pub use background::{resolve_background, BackgroundFallback, StyleNode, Theme};
pub use bridge::{PageHooks, Snapshot, SnapshotEvent, TestHooks};
pub use checks::{
    ColorSample, ContrastPair, ContrastReport, FrameSample, Inspector, Trigger, FLIP_FRAMES,
    HISTORY_SEED, IMPACT_SEED, MIN_HIGH_ROWS, SPINNER_APPEAR_TIMEOUT,
};
pub use color::{contrast_ratio, luminance, parse_color, Color};
pub use config::{
    BridgeConfig, CheckConfig, ContrastConfig, EventsConfig, HistoryConfig, MenuConfig,
    ThemeConfig,
};
pub use geometry::Rect;
pub use logging::LogFormat;
pub use page::{MockPage, Page, WaitState};
pub use result::{CheckError, CheckResult, Failure, FailureKind};
pub use sampler::{Change, Sample, SamplePlan, SampleSeries};
pub use scroll::{MenuMetrics, PeekMeasurement, PeekTolerance, ScrollEdge, ScrollerMetrics};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumBrowser, ChromiumPage, LaunchOptions};
