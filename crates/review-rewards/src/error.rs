use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::reviews::SeedError;

/// Startup failure of the review rewards binary.
///
/// Request-level failures never reach this type; handlers map service errors to
/// responses themselves.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("tracing setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not seed review catalog: {0}")]
    Seed(#[from] SeedError),
}
