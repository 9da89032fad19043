//! Tracing subscriber setup

use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use crate::environment::Environment;

/// Installs the global tracing subscriber
///
/// JSON output for staging/production, regular output for development.
/// `RUST_LOG` takes precedence over the environment's default level.
/// Calling this more than once is a no-op.
pub fn init_tracing(environment: Environment) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    let result = if environment.json_logs() {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
