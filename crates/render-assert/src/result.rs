//! Result and error types for render-assert.
//!
//! Driver-level problems (a page that cannot evaluate, a timeout, malformed
//! JSON) are plain [`CheckError`] variants. A check that ran and found the UI
//! in violation produces [`CheckError::Failed`] carrying a structured
//! [`Failure`], which keeps the raw measurements machine-inspectable until it
//! is rendered with `Display`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Result type for render-assert operations
pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that can occur while running a check
#[derive(Debug, Error)]
pub enum CheckError {
    /// The check ran and the UI violated an invariant
    #[error("{0}")]
    Failed(Failure),

    /// Page-level error reported by the browser collaborator
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// In-page script threw or returned an unexpected shape
    #[error("Script `{script}` failed: {message}")]
    Script {
        /// Short script name
        script: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Configuration could not be loaded
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckError {
    /// The structured failure, if this error is an assertion failure
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<Failure> for CheckError {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}

/// Failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required element or selector is absent
    Precondition,
    /// A measured value fell outside its tolerance window
    Threshold,
    /// A test hook function is missing or the snapshot is empty
    BridgeUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Precondition => "precondition",
            Self::Threshold => "threshold",
            Self::BridgeUnavailable => "bridge unavailable",
        };
        f.write_str(label)
    }
}

/// A structured assertion failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Name of the check that failed
    pub check: String,
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
    /// Raw measured values used to decide the failure
    pub measurements: Map<String, Value>,
}

impl Failure {
    /// Create a failure with no measurements
    #[must_use]
    pub fn new(check: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            kind,
            message: message.into(),
            measurements: Map::new(),
        }
    }

    /// Precondition failure ("X missing")
    #[must_use]
    pub fn precondition(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(check, FailureKind::Precondition, message)
    }

    /// Threshold violation
    #[must_use]
    pub fn threshold(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(check, FailureKind::Threshold, message)
    }

    /// Test hook bridge unavailable
    #[must_use]
    pub fn bridge(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(check, FailureKind::BridgeUnavailable, message)
    }

    /// Attach a measured value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.measurements.insert(key.into(), value);
        self
    }

    /// Look up a measured value
    #[must_use]
    pub fn measurement(&self, key: &str) -> Option<&Value> {
        self.measurements.get(key)
    }

    /// Report under a different check name, keeping the original one as the
    /// `step` measurement
    #[must_use]
    pub fn for_check(mut self, check: impl Into<String>) -> Self {
        let check = check.into();
        if self.check == check {
            return self;
        }
        let step = std::mem::replace(&mut self.check, check);
        self.with("step", step)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.check, self.message, self.kind)?;
        if !self.measurements.is_empty() {
            let rendered = serde_json::to_string(&self.measurements).map_err(|_| fmt::Error)?;
            write!(f, " {rendered}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

/// Turn a pass/fail predicate into a failure result
pub(crate) fn ensure(condition: bool, failure: impl FnOnce() -> Failure) -> Result<(), Failure> {
    if condition {
        Ok(())
    } else {
        Err(failure())
    }
}
