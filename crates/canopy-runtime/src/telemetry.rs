use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Result, ShellError};

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// `config.level`. Fails if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match (config.json, config.timestamps) {
        (true, _) => registry.with(fmt::layer().json()).try_init(),
        (false, true) => registry.with(fmt::layer()).try_init(),
        (false, false) => registry.with(fmt::layer().without_time()).try_init(),
    };
    installed.map_err(|e| ShellError::Telemetry(e.to_string()))
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ShellError::Telemetry(e.to_string()))
}
