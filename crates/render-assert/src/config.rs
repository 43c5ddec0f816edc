//! Check configuration.
//!
//! Every selector and tunable a check reads lives here. Defaults match the
//! dashboard markup the catalog was written against; a YAML file only needs
//! the keys it overrides.
//!
//! ```yaml
//! settle_ms: 600
//! menu:
//!   trigger: ".currency-picker"
//! peek:
//!   minRatio: 0.15
//! ```

use crate::background::{BackgroundFallback, Theme};
use crate::color::{parse_color, Color};
use crate::result::{CheckError, CheckResult};
use crate::scroll::PeekTolerance;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced by the impact level in [`EventsConfig::filter_toggle`]
pub const LEVEL_PLACEHOLDER: &str = "{level}";

/// Top-level configuration for an [`Inspector`](crate::Inspector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Theme fallback colors and attribute names
    #[serde(default)]
    pub theme: ThemeConfig,

    /// Contrast sampling limits and selectors
    #[serde(default)]
    pub contrast: ContrastConfig,

    /// Dropdown menu selectors
    #[serde(default)]
    pub menu: MenuConfig,

    /// Accepted peek window
    #[serde(default)]
    pub peek: PeekTolerance,

    /// Upcoming-events table selectors
    #[serde(default)]
    pub events: EventsConfig,

    /// History list selectors
    #[serde(default)]
    pub history: HistoryConfig,

    /// Test hook bridge settings
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Wait after a state change before re-measuring layout
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            theme: ThemeConfig::default(),
            contrast: ContrastConfig::default(),
            menu: MenuConfig::default(),
            peek: PeekTolerance::default(),
            events: EventsConfig::default(),
            history: HistoryConfig::default(),
            bridge: BridgeConfig::default(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_settle_ms() -> u64 {
    400
}

impl CheckConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> CheckResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| CheckError::Config {
            message: e.to_string(),
        })
    }

    /// Load a YAML file
    pub fn load(path: impl AsRef<Path>) -> CheckResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> CheckResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| CheckError::Config {
            message: e.to_string(),
        })
    }

    /// Set the peek tolerance
    #[must_use]
    pub const fn with_peek(mut self, peek: PeekTolerance) -> Self {
        self.peek = peek;
        self
    }

    /// Set the settle wait
    #[must_use]
    pub const fn with_settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set the test hook namespace on `window`
    #[must_use]
    pub fn with_bridge_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.bridge.namespace = namespace.into();
        self
    }

    /// Replace the menu selectors
    #[must_use]
    pub fn with_menu(mut self, menu: MenuConfig) -> Self {
        self.menu = menu;
        self
    }

    /// Replace the theme settings
    #[must_use]
    pub fn with_theme(mut self, theme: ThemeConfig) -> Self {
        self.theme = theme;
        self
    }

    /// Replace the events selectors
    #[must_use]
    pub fn with_events(mut self, events: EventsConfig) -> Self {
        self.events = events;
        self
    }

    /// Replace the history selectors
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}

/// Theme attribute and fallback background colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Attribute on `<html>` holding the theme name
    pub attribute: String,
    /// Custom property holding the themed page background
    pub background_var: String,
    /// Background assumed in light theme when nothing else resolves
    pub light_default: String,
    /// Background assumed in dark theme when nothing else resolves
    pub dark_default: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            attribute: "data-theme".to_string(),
            background_var: "--bg".to_string(),
            light_default: "#ffffff".to_string(),
            dark_default: "#1e1e1e".to_string(),
        }
    }
}

impl ThemeConfig {
    /// Build the fallback chain from the page-level values read in a sample
    #[must_use]
    pub fn fallback(&self, body: &str, theme_var: &str, theme: Option<&str>) -> BackgroundFallback {
        BackgroundFallback {
            body: parse_color(body),
            theme_var: parse_color(theme_var),
            theme: Theme::from_attribute(theme),
            light_default: self.light(),
            dark_default: self.dark(),
        }
    }

    /// Parsed light default
    #[must_use]
    pub fn light(&self) -> Color {
        parse_color(&self.light_default)
    }

    /// Parsed dark default
    #[must_use]
    pub fn dark(&self) -> Color {
        parse_color(&self.dark_default)
    }
}

/// Contrast sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Offenders listed in a failure message
    pub max_reported: usize,
    /// Elements inspected under one root
    pub max_elements: usize,
    /// Accent glyphs (icons, highlighted text) checked by `control_contrast`
    pub accent_selector: String,
    /// Controls whose borders are checked by `control_contrast`
    pub control_selector: String,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            max_reported: 12,
            max_elements: 400,
            accent_selector: "[data-accent], .accent, svg".to_string(),
            control_selector: "button, input, select, textarea".to_string(),
        }
    }
}

/// Dropdown selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Button that opens the menu
    pub trigger: String,
    /// Outer menu chrome
    pub menu: String,
    /// Inner scroll container
    pub scroller: String,
    /// One menu row
    pub item: String,
    /// Fixed footer the menu must not cover
    pub footer: String,
    /// Attribute on the outer menu exposing the scroll position
    pub indicator_attr: String,
    /// How long to wait for the menu after clicking the trigger
    pub open_timeout_ms: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            trigger: ".dropdown-trigger".to_string(),
            menu: ".dropdown-menu".to_string(),
            scroller: ".dropdown-scroll".to_string(),
            item: ".dropdown-item".to_string(),
            footer: "footer".to_string(),
            indicator_attr: "data-scroll".to_string(),
            open_timeout_ms: 2000,
        }
    }
}

/// Upcoming-events table selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Any event row
    pub row: String,
    /// High-impact event row
    pub high_row: String,
    /// Attribute carrying the event id on a row
    pub id_attr: String,
    /// Filter toggle; `{level}` is replaced by `low`, `medium` or `high`
    pub filter_toggle: String,
    /// How long to wait for seeded rows to render
    pub render_timeout_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            row: "#next-events .event-row".to_string(),
            high_row: r#"#next-events .event-row[data-impact="high"]"#.to_string(),
            id_attr: "data-event-id".to_string(),
            filter_toggle: r#"[data-impact-filter="{level}"]"#.to_string(),
            render_timeout_ms: 5000,
        }
    }
}

impl EventsConfig {
    /// Toggle selector for one impact level
    #[must_use]
    pub fn toggle_for(&self, level: &str) -> String {
        self.filter_toggle.replace(LEVEL_PLACEHOLDER, level)
    }

    /// Selector for the row with a given event id
    #[must_use]
    pub fn row_with_id(&self, id: &str) -> String {
        format!(r#"{}[{}="{}"]"#, self.row, self.id_attr, id.replace('"', "\\\""))
    }
}

/// History list selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Scroll container
    pub scroller: String,
    /// One history row
    pub row: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            scroller: "#history .history-list".to_string(),
            row: "#history .history-row".to_string(),
        }
    }
}

/// Test hook bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Property of `window` holding the hook functions
    pub namespace: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: "__testHooks".to_string(),
        }
    }
}
