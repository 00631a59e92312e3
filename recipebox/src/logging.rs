//! Logging setup
//!
//! Installs a `tracing` subscriber with an env filter. `RUST_LOG` takes
//! precedence over the default directive passed in by the caller.

use crate::error::{AppError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "recipebox=debug,info";

/// Initialize the global subscriber. Fails if one is already installed.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to initialize logging: {}", e)))
}
