//! Contrast checks.

use super::{with_restore, Inspector};
use crate::background::{resolve_background, BackgroundFallback, StyleNode};
use crate::color::{
    parse_color, Color, MIN_CONTRAST_ACCENT, MIN_CONTRAST_BORDER, MIN_CONTRAST_TEXT,
};
use crate::config::ThemeConfig;
use crate::page::{evaluate_as, Page};
use crate::result::{CheckError, CheckResult, Failure, FailureKind};
use crate::scripts;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Page-level values the background fallback needs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageContext {
    body: String,
    #[serde(default)]
    theme_var: String,
    #[serde(default)]
    theme: Option<String>,
}

impl PageContext {
    fn fallback(&self, theme: &ThemeConfig) -> BackgroundFallback {
        theme.fallback(&self.body, &self.theme_var, self.theme.as_deref())
    }
}

/// A foreground color and the background chain behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    /// Element description for messages
    pub label: String,
    /// Computed foreground color
    pub color: String,
    /// Background chain, nearest first
    pub chain: Vec<StyleNode>,
}

#[derive(Debug, Deserialize)]
struct TextSamples {
    context: PageContext,
    samples: Vec<ColorSample>,
}

#[derive(Debug, Deserialize)]
struct ControlSamples {
    context: PageContext,
    accents: Vec<ColorSample>,
    borders: Vec<ColorSample>,
}

/// A measured pair below its minimum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastPair {
    /// Element description
    pub label: String,
    /// Foreground color
    pub foreground: String,
    /// Resolved background color
    pub background: String,
    /// Contrast ratio
    pub ratio: f64,
    /// Required minimum
    pub minimum: f64,
}

/// Aggregated contrast measurements for one check
#[derive(Debug, Clone, Serialize)]
pub struct ContrastReport {
    /// Lowest ratio seen
    pub min_ratio: f64,
    /// Number of pairs measured
    pub pairs_analyzed: usize,
    /// Pairs below their minimum, in document order
    pub violations: Vec<ContrastPair>,
}

impl Default for ContrastReport {
    fn default() -> Self {
        Self {
            min_ratio: f64::MAX,
            pairs_analyzed: 0,
            violations: Vec::new(),
        }
    }
}

impl ContrastReport {
    /// Measure one sample against `minimum`. Invisible foregrounds are skipped.
    pub fn add_sample(&mut self, sample: &ColorSample, fallback: &BackgroundFallback, minimum: f64) {
        let foreground = parse_color(&sample.color);
        if !foreground.is_usable() {
            return;
        }
        let background = resolve_background(&sample.chain, fallback);
        self.add_pair(&sample.label, foreground, background, minimum);
    }

    /// Record a resolved pair
    pub fn add_pair(&mut self, label: &str, foreground: Color, background: Color, minimum: f64) {
        let ratio = foreground.contrast_ratio(&background);
        self.pairs_analyzed += 1;
        self.min_ratio = self.min_ratio.min(ratio);
        if ratio < minimum {
            self.violations.push(ContrastPair {
                label: label.to_string(),
                foreground: foreground.to_string(),
                background: background.to_string(),
                ratio,
                minimum,
            });
        }
    }

    /// Whether every pair met its minimum
    #[must_use]
    pub fn passes(&self) -> bool {
        self.violations.is_empty()
    }

    /// One failure listing up to `max_reported` offenders
    pub fn into_result(self, check: &str, what: &str, max_reported: usize) -> Result<(), Failure> {
        if self.passes() {
            return Ok(());
        }
        let listed: Vec<String> = self
            .violations
            .iter()
            .take(max_reported)
            .map(|v| {
                format!(
                    "{} {:.2}:1 < {} ({} on {})",
                    v.label, v.ratio, v.minimum, v.foreground, v.background
                )
            })
            .collect();
        let more = self.violations.len().saturating_sub(max_reported);
        let mut message = format!(
            "{} of {} {what} below minimum contrast: {}",
            self.violations.len(),
            self.pairs_analyzed,
            listed.join("; ")
        );
        if more > 0 {
            message.push_str(&format!(" (+{more} more)"));
        }
        let reported: Vec<&ContrastPair> = self.violations.iter().take(max_reported).collect();
        Err(Failure::threshold(check, message)
            .with("violations", &reported)
            .with("violation_count", self.violations.len())
            .with("pairs_analyzed", self.pairs_analyzed)
            .with("min_ratio", self.min_ratio))
    }
}

impl<'p, P: Page + ?Sized> Inspector<'p, P> {
    async fn text_samples(&self, check: &str, root: &str) -> CheckResult<TextSamples> {
        let theme = &self.config.theme;
        let samples: Option<TextSamples> = evaluate_as(
            self.page,
            &scripts::TEXT_SAMPLES,
            json!({
                "root": root,
                "max": self.config.contrast.max_elements,
                "themeAttr": theme.attribute,
                "themeVar": theme.background_var,
            }),
        )
        .await?;
        samples.ok_or_else(|| Failure::precondition(check, format!("{root} missing")).into())
    }

    /// Every visible text-bearing element under `root` reaches 3.0:1
    pub async fn text_contrast(&self, root: &str) -> CheckResult<()> {
        const CHECK: &str = "text_contrast";
        debug!(check = CHECK, root, "Running check");
        let TextSamples { context, samples } = self.text_samples(CHECK, root).await?;
        let fallback = context.fallback(&self.config.theme);
        let mut report = ContrastReport::default();
        for sample in &samples {
            report.add_sample(sample, &fallback, MIN_CONTRAST_TEXT);
        }
        debug!(check = CHECK, pairs = report.pairs_analyzed, violations = report.violations.len(), "Measured contrast");
        report
            .into_result(CHECK, "text elements", self.config.contrast.max_reported)
            .map_err(|f| f.with("root", root).with("theme", &context.theme).into())
    }

    /// Accent glyphs reach 3.0:1 and control borders 1.6:1 against the
    /// surface behind them
    pub async fn control_contrast(&self, root: &str) -> CheckResult<()> {
        const CHECK: &str = "control_contrast";
        debug!(check = CHECK, root, "Running check");
        let theme = &self.config.theme;
        let contrast = &self.config.contrast;
        let samples: Option<ControlSamples> = evaluate_as(
            self.page,
            &scripts::CONTROL_SAMPLES,
            json!({
                "root": root,
                "accent": contrast.accent_selector,
                "control": contrast.control_selector,
                "themeAttr": theme.attribute,
                "themeVar": theme.background_var,
            }),
        )
        .await?;
        let samples =
            samples.ok_or_else(|| Failure::precondition(CHECK, format!("{root} missing")))?;
        let fallback = samples.context.fallback(theme);

        let mut report = ContrastReport::default();
        for accent in &samples.accents {
            report.add_sample(accent, &fallback, MIN_CONTRAST_ACCENT);
        }
        for border in &samples.borders {
            report.add_sample(border, &fallback, MIN_CONTRAST_BORDER);
        }
        if report.pairs_analyzed == 0 {
            return Err(Failure::precondition(CHECK, format!("no accents or bordered controls under {root}"))
                .with("root", root)
                .into());
        }
        report
            .into_result(CHECK, "accents and borders", contrast.max_reported)
            .map_err(|f| f.with("root", root).into())
    }

    async fn set_theme(&self, value: Option<&str>) -> CheckResult<Option<String>> {
        evaluate_as(
            self.page,
            &scripts::SET_THEME,
            json!({ "attr": self.config.theme.attribute, "value": value }),
        )
        .await
    }

    async fn contrast_per_theme(&self, check: &str, root: &str, themes: &[&str]) -> CheckResult<()> {
        let mut failed: Vec<(&str, Failure)> = Vec::new();
        for &theme in themes {
            self.set_theme(Some(theme)).await?;
            if let Err(e) = self.text_contrast(root).await {
                match e {
                    CheckError::Failed(failure) if failure.kind == FailureKind::Threshold => {
                        failed.push((theme, failure));
                    }
                    other => return Err(other),
                }
            }
        }
        if failed.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = failed.iter().map(|(t, _)| *t).collect();
        let details: Vec<Value> = failed
            .iter()
            .map(|(t, f)| json!({ "theme": t, "message": f.message, "measurements": f.measurements }))
            .collect();
        Err(Failure::threshold(
            check,
            format!("text contrast fails in theme(s) {}", names.join(", ")),
        )
        .with("themes", &names)
        .with("failures", &details)
        .into())
    }

    /// [`text_contrast`](Self::text_contrast) under each theme attribute
    /// value, restoring the original theme afterwards
    pub async fn contrast_across_themes(&self, root: &str, themes: &[&str]) -> CheckResult<()> {
        const CHECK: &str = "contrast_across_themes";
        debug!(check = CHECK, root, ?themes, "Running check");
        let original: Option<String> = evaluate_as(
            self.page,
            &scripts::GET_ATTRIBUTE,
            json!({ "selector": ":root", "attr": self.config.theme.attribute }),
        )
        .await?;

        let body = self.contrast_per_theme(CHECK, root, themes);
        let restore = async {
            debug!(check = CHECK, theme = ?original, "Restoring theme");
            self.set_theme(original.as_deref()).await.map(|_| ())
        };
        with_restore(CHECK, body, restore).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::page::MockPage;

    fn context(theme: &str) -> Value {
        json!({ "body": "rgb(255, 255, 255)", "themeVar": "", "theme": theme })
    }

    fn sample(label: &str, color: &str, chain: &[(&str, &str)]) -> Value {
        let chain: Vec<Value> = chain
            .iter()
            .map(|(c, i)| json!({ "backgroundColor": c, "backgroundImage": i }))
            .collect();
        json!({ "label": label, "color": color, "chain": chain })
    }

    mod report_tests {
        use super::*;

        fn fallback() -> BackgroundFallback {
            ThemeConfig::default().fallback("rgb(255, 255, 255)", "", None)
        }

        #[test]
        fn test_black_on_white_passes() {
            let s: ColorSample = serde_json::from_value(sample("p", "rgb(0, 0, 0)", &[("rgba(0, 0, 0, 0)", "none")])).unwrap();
            let mut report = ContrastReport::default();
            report.add_sample(&s, &fallback(), MIN_CONTRAST_TEXT);
            assert!(report.passes());
            assert!((report.min_ratio - 21.0).abs() < 1e-6);
        }

        #[test]
        fn test_transparent_foreground_skipped() {
            let s: ColorSample = serde_json::from_value(sample("span", "rgba(0, 0, 0, 0)", &[])).unwrap();
            let mut report = ContrastReport::default();
            report.add_sample(&s, &fallback(), MIN_CONTRAST_TEXT);
            assert_eq!(report.pairs_analyzed, 0);
        }

        #[test]
        fn test_failure_caps_listed_offenders() {
            let mut report = ContrastReport::default();
            for i in 0..15 {
                report.add_pair(&format!("li{i}"), Color::rgb(250, 250, 250), Color::WHITE, 3.0);
            }
            let failure = report.into_result("text_contrast", "text elements", 12).unwrap_err();
            assert!(failure.message.starts_with("15 of 15 text elements"));
            assert!(failure.message.ends_with("(+3 more)"));
            assert_eq!(failure.measurement("violations").unwrap().as_array().unwrap().len(), 12);
            assert_eq!(failure.measurement("violation_count").unwrap(), 15);
        }
    }

    mod check_tests {
        use super::*;

        #[tokio::test]
        async fn test_text_contrast_collects_all_violations() {
            let page = MockPage::new();
            page.respond(
                &scripts::TEXT_SAMPLES,
                json!({
                    "context": context("light"),
                    "samples": [
                        sample("h1 \"Title\"", "rgb(20, 20, 20)", &[("rgba(0, 0, 0, 0)", "none")]),
                        sample("span \"faint\"", "rgb(200, 200, 200)", &[("rgb(255, 255, 255)", "none")]),
                        sample("em \"dim\"", "rgb(190, 190, 190)", &[("rgba(0, 0, 0, 0)", "none")]),
                    ]
                }),
            );
            let err = Inspector::new(&page).text_contrast("main").await.unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::Threshold);
            assert!(failure.message.starts_with("2 of 3 text elements"));
            assert!(failure.message.contains("span \"faint\""));
            assert!(failure.message.contains("em \"dim\""));
        }

        #[tokio::test]
        async fn test_text_on_gradient_uses_theme_default() {
            let page = MockPage::new();
            page.respond(
                &scripts::TEXT_SAMPLES,
                json!({
                    "context": { "body": "rgba(0, 0, 0, 0)", "themeVar": "", "theme": "dark" },
                    "samples": [
                        sample("p", "rgb(230, 230, 230)", &[("rgba(0, 0, 0, 0)", "linear-gradient(red, blue)"), ("rgb(255, 255, 255)", "none")]),
                    ]
                }),
            );
            // Light text resolves against #1e1e1e, not the white ancestor above the gradient
            Inspector::new(&page).text_contrast("main").await.unwrap();
        }

        #[tokio::test]
        async fn test_missing_root_is_precondition() {
            let page = MockPage::new();
            page.respond(&scripts::TEXT_SAMPLES, Value::Null);
            let err = Inspector::new(&page).text_contrast("#nope").await.unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::Precondition);
        }

        #[tokio::test]
        async fn test_control_contrast_uses_border_threshold() {
            let page = MockPage::new();
            page.respond(
                &scripts::CONTROL_SAMPLES,
                json!({
                    "context": context("light"),
                    "accents": [sample("svg.icon", "rgb(0, 90, 200)", &[("rgb(255, 255, 255)", "none")])],
                    // ~2.3:1 clears the 1.6 border minimum
                    "borders": [sample("button", "rgb(170, 170, 170)", &[("rgb(255, 255, 255)", "none")])],
                }),
            );
            Inspector::new(&page).control_contrast("form").await.unwrap();
            let args = page.args_for(&scripts::CONTROL_SAMPLES);
            assert_eq!(args[0]["control"], "button, input, select, textarea");
        }

        #[tokio::test]
        async fn test_control_contrast_flags_faint_border() {
            let page = MockPage::new();
            page.respond(
                &scripts::CONTROL_SAMPLES,
                json!({
                    "context": context("light"),
                    "accents": [],
                    "borders": [sample("input#q", "rgb(230, 230, 230)", &[("rgb(255, 255, 255)", "none")])],
                }),
            );
            let err = Inspector::new(&page).control_contrast("form").await.unwrap_err();
            assert!(err.failure().unwrap().message.contains("input#q"));
        }

        #[tokio::test]
        async fn test_control_contrast_without_samples_is_precondition() {
            let page = MockPage::new();
            page.respond(
                &scripts::CONTROL_SAMPLES,
                json!({ "context": context("light"), "accents": [], "borders": [] }),
            );
            let err = Inspector::new(&page).control_contrast("form").await.unwrap_err();
            assert_eq!(err.failure().unwrap().kind, FailureKind::Precondition);
        }

        #[tokio::test]
        async fn test_themes_restored_after_failure() {
            let page = MockPage::new();
            page.respond(&scripts::GET_ATTRIBUTE, json!("light"));
            page.respond(&scripts::SET_THEME, json!("light"));
            page.respond(
                &scripts::TEXT_SAMPLES,
                json!({ "context": context("light"), "samples": [sample("p", "rgb(0, 0, 0)", &[])] }),
            );
            page.respond(
                &scripts::TEXT_SAMPLES,
                json!({ "context": context("dark"), "samples": [sample("p", "rgb(250, 250, 250)", &[])] }),
            );
            let inspector = Inspector::with_config(&page, CheckConfig::default());
            let err = inspector
                .contrast_across_themes("main", &["light", "dark"])
                .await
                .unwrap_err();
            let failure = err.failure().unwrap();
            assert_eq!(failure.message, "text contrast fails in theme(s) dark");

            let theme_args = page.args_for(&scripts::SET_THEME);
            let last = theme_args.last().unwrap();
            assert_eq!(last["value"], "light");
            assert_eq!(last["attr"], "data-theme");
        }
    }
}
