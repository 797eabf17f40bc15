//! Telemetry and Observability
//!
//! Handles setting up `tracing-subscriber` for structured logging.
//! Supports config-driven log levels, environment variable overrides,
//! and format switching between pretty (debug) and JSON (release).
//!
//! The subscriber is installed once, before config is read. Its filter sits
//! behind a reload layer so the level from `[core] log_level` can be applied
//! afterwards through the returned `LogLevelHandle`.
//!
//! Logs go to stderr; stdout is reserved for command output.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(log_level: &str) -> String {
    format!("{},edith_engine={}", log_level, log_level)
}

/// Swaps the level of an installed subscriber
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevelHandle {
    /// Replace the active filter with `log_level`
    pub fn set_level(&self, log_level: &str) -> Result<(), reload::Error> {
        self.inner.reload(EnvFilter::new(default_filter(log_level)))
    }

    /// Apply the configured level unless `RUST_LOG` chose the filter
    pub fn apply_config_level(&self, log_level: &str) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        tracing::debug!("Applying configured log level '{}'", log_level);
        self.set_level(log_level)
    }
}

/// Reloadable filter layer for `log_level`, `RUST_LOG` taking priority
pub fn filter_layer(log_level: &str) -> (reload::Layer<EnvFilter, Registry>, LogLevelHandle) {
    let (env_filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_filter(log_level)), false),
    };

    let (layer, inner) = reload::Layer::new(env_filter);
    (layer, LogLevelHandle { inner, from_env })
}

/// Initialize the tracing subscriber with the given log level.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info"
///
/// In debug builds: pretty-printed terminal output.
/// In release builds: JSON structured output with spans.
///
/// Returns `None` if a global subscriber was already installed.
pub fn init_telemetry_with_level(log_level: &str) -> Option<LogLevelHandle> {
    let (filter, handle) = filter_layer(log_level);

    #[cfg(debug_assertions)]
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .pretty()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();

    #[cfg(not(debug_assertions))]
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr),
        )
        .try_init();

    installed.ok().map(|_| handle)
}

/// Initialize the tracing subscriber with default settings.
pub fn init_telemetry() -> Option<LogLevelHandle> {
    init_telemetry_with_level("info")
}
