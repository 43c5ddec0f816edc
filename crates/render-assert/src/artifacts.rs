//! Screenshot artifacts handed to the report generator.
//!
//! Captures are written as PNG files into one output directory and indexed
//! by an [`ArtifactLog`]. The log serializes to the camelCase JSON the
//! report page reads:
//!
//! ```json
//! {
//!   "captures": [
//!     { "scenario": "dropdown", "state": "open", "theme": "dark", "path": "dropdown-open-dark.png" },
//!     { "scenario": "spinner", "state": "loading", "frames": ["spinner-loading-0.png"], "frameGapMs": 120 }
//!   ],
//!   "videos": []
//! }
//! ```

use crate::page::Page;
use crate::result::CheckResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a capture stores: one still or an ordered filmstrip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureMedia {
    /// Single screenshot
    Still {
        /// File name relative to the output directory
        path: String,
    },
    /// Screenshots taken at a fixed interval
    Filmstrip {
        /// File names relative to the output directory, in capture order
        frames: Vec<String>,
        /// Delay between frames
        #[serde(rename = "frameGapMs")]
        frame_gap_ms: u64,
    },
}

/// One indexed capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Scenario name, e.g. `dropdown`
    pub scenario: String,
    /// UI state within the scenario, e.g. `scrolled-bottom`
    pub state: String,
    /// Theme the capture was taken in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Files
    #[serde(flatten)]
    pub media: CaptureMedia,
    /// Caption shown in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Index of all captures and recorded videos for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLog {
    /// Captures in the order they were taken
    #[serde(default)]
    pub captures: Vec<Capture>,
    /// Video file paths
    #[serde(default)]
    pub videos: Vec<String>,
}

impl ArtifactLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a capture
    pub fn push(&mut self, capture: Capture) {
        self.captures.push(capture);
    }

    /// Record a video path
    pub fn add_video(&mut self, path: impl Into<String>) {
        self.videos.push(path.into());
    }

    /// Captures for one scenario
    pub fn for_scenario<'a>(&'a self, scenario: &'a str) -> impl Iterator<Item = &'a Capture> + 'a {
        self.captures.iter().filter(move |c| c.scenario == scenario)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn write_json(&self, path: impl AsRef<Path>) -> CheckResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), captures = self.captures.len(), "Wrote artifact log");
        Ok(())
    }

    /// Read a previously written log
    pub fn read_json(path: impl AsRef<Path>) -> CheckResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Names a capture before it is taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    scenario: String,
    state: String,
    theme: Option<String>,
    label: Option<String>,
}

impl CaptureTarget {
    /// Capture of `state` within `scenario`
    #[must_use]
    pub fn new(scenario: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            state: state.into(),
            theme: None,
            label: None,
        }
    }

    /// Set theme
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Set caption
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn stem(&self) -> String {
        let mut parts = vec![self.scenario.as_str(), self.state.as_str()];
        if let Some(theme) = &self.theme {
            parts.push(theme);
        }
        parts
            .iter()
            .map(|p| file_safe(p))
            .collect::<Vec<_>>()
            .join("-")
    }

    fn into_capture(self, media: CaptureMedia) -> Capture {
        Capture {
            scenario: self.scenario,
            state: self.state,
            theme: self.theme,
            media,
            label: self.label,
        }
    }
}

fn file_safe(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// Takes screenshots into an output directory and indexes them
#[derive(Debug)]
pub struct Recorder<'p, P: Page + ?Sized> {
    page: &'p P,
    out_dir: PathBuf,
    log: ArtifactLog,
}

impl<'p, P: Page + ?Sized> Recorder<'p, P> {
    /// Recorder writing into `out_dir`
    #[must_use]
    pub fn new(page: &'p P, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            out_dir: out_dir.into(),
            log: ArtifactLog::new(),
        }
    }

    /// Output directory
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Captures so far
    #[must_use]
    pub const fn log(&self) -> &ArtifactLog {
        &self.log
    }

    /// Finish and hand back the log
    #[must_use]
    pub fn into_log(self) -> ArtifactLog {
        self.log
    }

    async fn shoot(&self, file_name: &str) -> CheckResult<()> {
        let png = self.page.screenshot().await?;
        std::fs::create_dir_all(&self.out_dir)?;
        std::fs::write(self.out_dir.join(file_name), png)?;
        Ok(())
    }

    /// Take one screenshot
    pub async fn still(&mut self, target: CaptureTarget) -> CheckResult<&Capture> {
        let path = format!("{}.png", target.stem());
        self.shoot(&path).await?;
        debug!(path = %path, "Captured still");
        self.log.push(target.into_capture(CaptureMedia::Still { path }));
        Ok(self.last())
    }

    /// Take `frames` screenshots `frame_gap_ms` apart
    pub async fn filmstrip(
        &mut self,
        target: CaptureTarget,
        frames: usize,
        frame_gap_ms: u64,
    ) -> CheckResult<&Capture> {
        let stem = target.stem();
        let mut paths = Vec::with_capacity(frames);
        for frame in 0..frames {
            if frame > 0 {
                self.page.wait_for_timeout(frame_gap_ms).await;
            }
            let path = format!("{stem}-{frame}.png");
            self.shoot(&path).await?;
            paths.push(path);
        }
        debug!(stem = %stem, frames, "Captured filmstrip");
        self.log.push(target.into_capture(CaptureMedia::Filmstrip {
            frames: paths,
            frame_gap_ms,
        }));
        Ok(self.last())
    }

    fn last(&self) -> &Capture {
        // push always precedes this call
        &self.log.captures[self.log.captures.len() - 1]
    }

    /// Write the log as `artifacts.json` in the output directory
    pub fn write_index(&self) -> CheckResult<PathBuf> {
        let path = self.out_dir.join("artifacts.json");
        self.log.write_json(&path)?;
        Ok(path)
    }
}
