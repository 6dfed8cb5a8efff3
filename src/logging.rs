// Logging setup. Native hosts and tests get a tracing subscriber on stderr.
// In the browser no subscriber is installed; tracing events fall through to
// `log` records and `console_log` writes them to the devtools console.

use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

use crate::error::EngineError;

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `default_level`.
///
/// Fails if `default_level` is not a level name or a global subscriber is
/// already set.
pub fn init(default_level: &str) -> Result<(), EngineError> {
    let level: LevelFilter = default_level
        .parse()
        .map_err(|e| EngineError::InvalidConfig(format!("log level {:?}: {}", default_level, e)))?;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

    tracing::debug!(level = %level, "logging initialized");
    Ok(())
}

/// Route log records to the browser console. Called from the wasm start hook.
///
/// Fails if `default_level` is not a level name or a logger is already set.
#[cfg(target_arch = "wasm32")]
pub fn init_console(default_level: &str) -> Result<(), EngineError> {
    let level: log::Level = default_level
        .parse()
        .map_err(|e| EngineError::InvalidConfig(format!("log level {:?}: {}", default_level, e)))?;

    console_log::init_with_level(level).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

    tracing::debug!(level = %level, "console logging initialized");
    Ok(())
}
