//! Structured logging setup shared by the monitor daemons.

use crate::error::{NetmondError, Result};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// Initializes the global tracing subscriber.
///
/// Level defaults to `info`; `RUST_LOG` overrides it per target. Fails if a
/// subscriber is already installed.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NetmondError::Config(format!("failed to set logger: {}", e)))?;

    Ok(())
}
