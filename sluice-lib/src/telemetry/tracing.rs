use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::config::LoggingConfig;
use crate::error::{Result, SluiceError};

/// Install the global tracing subscriber.
///
/// RUST_LOG, when set, overrides the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(config.show_target);

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| SluiceError::Config(format!("Failed to set global tracing subscriber: {e}")))?;

    Ok(())
}
