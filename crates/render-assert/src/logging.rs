//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "render_assert=info";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, for CI log collectors
    Json,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global fmt subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(format: LogFormat) -> bool {
    install(format, false)
}

/// Like [`init`], but output goes through the test harness so it is
/// captured per test. Safe to call from every test's setup.
pub fn init_for_tests(format: LogFormat) -> bool {
    install(format, true)
}

fn install(format: LogFormat, captured: bool) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true);
    let installed = match (format, captured) {
        (LogFormat::Text, false) => builder.try_init(),
        (LogFormat::Text, true) => builder.with_test_writer().try_init(),
        (LogFormat::Json, false) => builder.json().with_current_span(false).try_init(),
        (LogFormat::Json, true) => builder
            .json()
            .with_current_span(false)
            .with_test_writer()
            .try_init(),
    };
    installed.is_ok()
}
