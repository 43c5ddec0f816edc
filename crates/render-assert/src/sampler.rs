//! Temporal sampling of computed styles.
//!
//! One parameterized loop, [`sample_until`], serves every motion check: the
//! plans differ only in count, cadence and wall-clock budget. A series is
//! *changed* when two temporally adjacent present samples differ.
//!
//! Cancellation is by exhaustion only. The loop stops at the sample cap or
//! when the budget is spent, whichever comes first, and hands back whatever
//! it collected; deciding whether that is enough is the caller's job.

use crate::page::Page;
use crate::result::{ensure, CheckResult, Failure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Computed-style snapshot: property name to value
pub type StyleSample = BTreeMap<String, String>;

/// Polling plan for one sampling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePlan {
    /// Maximum number of samples
    pub count: usize,
    /// Pause between consecutive samples
    pub interval: Duration,
    /// Wall-clock budget for the whole run
    pub timeout: Option<Duration>,
}

impl SamplePlan {
    /// Opacity/transform interpolation: 7 samples, 80ms apart
    pub const MOTION: Self = Self::new(7, 80);

    /// Indefinite spinner: up to 8 samples at 120ms within 2.8s
    pub const SPINNER: Self = Self::new(8, 120).with_timeout(2_800);

    /// Create a plan without a wall-clock budget
    #[must_use]
    pub const fn new(count: usize, interval_ms: u64) -> Self {
        Self {
            count,
            interval: Duration::from_millis(interval_ms),
            timeout: None,
        }
    }

    /// Set the wall-clock budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }
}

/// One observation in a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Sample<T> {
    /// Element present; value read
    Present {
        /// Logical frame index
        frame: usize,
        /// Observed value
        value: T,
    },
    /// Element absent at this frame
    Missing {
        /// Logical frame index
        frame: usize,
    },
}

impl<T> Sample<T> {
    /// Observed value, if present
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Present { value, .. } => Some(value),
            Self::Missing { .. } => None,
        }
    }
}

/// Classification of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    /// Some adjacent pair differs
    Changed,
    /// Every adjacent pair is equal
    Static,
}

/// Ordered samples for one element across one polling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries<T> {
    samples: Vec<Sample<T>>,
    /// Whether the wall-clock budget cut the run short
    pub timed_out: bool,
}

impl<T> Default for SampleSeries<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            timed_out: false,
        }
    }
}

impl<T: PartialEq> SampleSeries<T> {
    /// Build a series from per-frame observations (`None` = missing)
    pub fn from_observations(observations: impl IntoIterator<Item = Option<T>>) -> Self {
        let mut series = Self::default();
        for observation in observations {
            series.push(observation);
        }
        series
    }

    /// Append the next frame's observation
    pub fn push(&mut self, observation: Option<T>) {
        let frame = self.samples.len();
        self.samples.push(match observation {
            Some(value) => Sample::Present { frame, value },
            None => Sample::Missing { frame },
        });
    }

    /// All samples, missing ones included
    #[must_use]
    pub fn samples(&self) -> &[Sample<T>] {
        &self.samples
    }

    /// Present values in order
    pub fn present(&self) -> impl Iterator<Item = &T> {
        self.samples.iter().filter_map(Sample::value)
    }

    /// Number of present samples
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.present().count()
    }

    /// Number of missing samples
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.samples.len() - self.present_count()
    }

    /// Changed if any two adjacent present samples differ
    #[must_use]
    pub fn classify(&self) -> Change {
        let values: Vec<&T> = self.present().collect();
        if values.windows(2).any(|pair| pair[0] != pair[1]) {
            Change::Changed
        } else {
            Change::Static
        }
    }

    /// Precondition failure when fewer than `min` samples were present
    pub fn require_present(&self, min: usize, check: &str) -> Result<(), Failure> {
        let present = self.present_count();
        ensure(present >= min, || {
            Failure::precondition(
                check,
                format!("element missing for sampling: {present} of {} samples present (need {min})", self.samples.len()),
            )
            .with("present", present)
            .with("missing", self.missing_count())
            .with("timed_out", self.timed_out)
        })
    }
}

/// Collect a series by calling `read` at the cadence of `plan`.
///
/// `read` receives the frame index and returns `None` when the element is
/// absent; that frame is recorded as missing and sampling continues. Reader
/// errors (page failures) abort the run.
pub async fn sample_until<P, T, F, Fut>(
    page: &P,
    plan: &SamplePlan,
    mut read: F,
) -> CheckResult<SampleSeries<T>>
where
    P: Page + ?Sized,
    T: PartialEq,
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = CheckResult<Option<T>>>,
{
    let started = Instant::now();
    let mut series = SampleSeries::default();
    for frame in 0..plan.count {
        if let Some(budget) = plan.timeout {
            if frame > 0 && started.elapsed() >= budget {
                series.timed_out = true;
                break;
            }
        }
        series.push(read(frame).await?);
        if frame + 1 < plan.count {
            page.wait_for_timeout(plan.interval.as_millis() as u64).await;
        }
    }
    debug!(
        samples = series.samples().len(),
        present = series.present_count(),
        timed_out = series.timed_out,
        "sampling finished"
    );
    Ok(series)
}

/// Parse one CSS `<time>` value into milliseconds
#[must_use]
pub fn parse_time_ms(entry: &str) -> Option<f64> {
    let entry = entry.trim();
    let value = if let Some(ms) = entry.strip_suffix("ms") {
        ms.trim().parse::<f64>().ok()?
    } else if let Some(s) = entry.strip_suffix('s') {
        s.trim().parse::<f64>().ok()? * 1000.0
    } else {
        return None;
    };
    value.is_finite().then_some(value)
}

/// Largest duration in a comma-separated `transition-duration` or
/// `animation-duration` list; unreadable entries count as 0
#[must_use]
pub fn max_declared_duration_ms(list: &str) -> f64 {
    list.split(',')
        .map(|entry| parse_time_ms(entry).unwrap_or(0.0))
        .fold(0.0, f64::max)
}

/// Whether a computed `transform` leaves the element where layout put it
#[must_use]
pub fn is_identity_transform(transform: &str) -> bool {
    let t = transform.trim();
    if t.is_empty() || t == "none" {
        return true;
    }
    let numbers = |prefix: &str| -> Option<Vec<f64>> {
        let body = t.strip_prefix(prefix)?.strip_suffix(')')?;
        body.split(',').map(|n| n.trim().parse::<f64>().ok()).collect()
    };
    let close = |values: &[f64], identity: &[f64]| {
        values.len() == identity.len()
            && values.iter().zip(identity).all(|(v, i)| (v - i).abs() < 1e-3)
    };
    if let Some(values) = numbers("matrix(") {
        return close(&values, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }
    if let Some(values) = numbers("matrix3d(") {
        let identity = [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        return close(&values, &identity);
    }
    false
}

/// Whether a `transition-property`/`transition-duration` pair animates
/// `transform`. Durations repeat cyclically over the property list.
#[must_use]
pub fn transitions_transform(property: &str, duration: &str) -> bool {
    let durations: Vec<f64> = duration
        .split(',')
        .map(|d| parse_time_ms(d).unwrap_or(0.0))
        .collect();
    if durations.is_empty() {
        return false;
    }
    property.split(',').enumerate().any(|(i, prop)| {
        let prop = prop.trim();
        (prop == "transform" || prop == "all") && durations[i % durations.len()] > 0.0
    })
}
