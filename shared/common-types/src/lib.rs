//! Types shared by the weather record store and the alert dispatcher

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Weather service configuration
pub mod config;
/// Geographic coordinates and location keys
pub mod coordinates;
/// Deployment environment selection
pub mod environment;
/// Tracing subscriber setup
pub mod telemetry;

pub use config::{ConfigError, WeatherConfig};
pub use coordinates::Coordinates;
pub use environment::Environment;
