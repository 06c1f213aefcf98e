pub mod config;
pub mod error;

pub use config::{
    BackgroundConfig, Config, DisplayConfig, GeocodingConfig, LocationConfig, LocationSource,
    ValidationResult, WeatherServiceConfig,
};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
    WeatherError,
};

use anyhow::Result;

/// Initialize logging. Safe to call more than once.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
