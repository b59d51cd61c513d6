//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apistrap_core::error::{ApiStrapError, Result};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// A second call returns a `Config` error instead of panicking, so tests and
/// embedders that already installed a subscriber can ignore it.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let level = cfg.filter_level()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = if cfg.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    installed.map_err(|e| ApiStrapError::Config(format!("logging init failed: {e}")))
}
