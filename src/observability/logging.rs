//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level, including on reload
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Changes the configured log level of the installed subscriber.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevelHandle {
    /// Replace the filter with `level` for this crate. Ignored when the
    /// filter came from `RUST_LOG`.
    pub fn set_level(&self, level: &str) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        self.handle.reload(crate_filter(level))
    }
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("chain_connect={level}"))
}

fn filter_layer(level: &str) -> (reload::Layer<EnvFilter, Registry>, LogLevelHandle) {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (crate_filter(level), false),
    };
    let (layer, handle) = reload::Layer::new(filter);
    (layer, LogLevelHandle { handle, from_env })
}

/// Install the global subscriber. A second call leaves the first one in place;
/// the returned handle then has nothing to reload.
pub fn init_logging(config: &ObservabilityConfig) -> LogLevelHandle {
    let (filter, handle) = filter_layer(&config.log_level);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
    handle
}
