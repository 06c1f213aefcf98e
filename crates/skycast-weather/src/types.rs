use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::{AppError, DatabaseError, NetworkError};

/// How long a persisted snapshot may be surfaced on activation.
pub const SNAPSHOT_VALIDITY_HOURS: i64 = 24;

/// Device position as reported by a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A reverse-geocoded place. Only `city_name` drives the refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city_name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Place {
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            city_name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Forecast for one city. Temperatures are preformatted by the service and
/// carry no unit at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub overview: String,
    pub current_temperature: String,
    pub max_temperature: String,
    pub min_temperature: String,
}

/// Persisted display state.
///
/// Text fields use `None` for "never written", which is distinct from a
/// stored empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: Option<String>,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,
    pub current_temp: Option<String>,
    pub high_temp: Option<String>,
    pub low_temp: Option<String>,
    pub weather_image: Option<String>,
    pub is_celsius: bool,
    pub saved_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Whether the snapshot is young enough to be shown on activation.
    pub fn is_fresh(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now - self.saved_at < validity
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.saved_at
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location is not supported on this device")]
    FeatureUnsupported,
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised inside the weather pipeline. None of these reach the UI as
/// errors; the view-model turns them into messages or silent no-ops.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("No location could be obtained")]
    LocationUnavailable,
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Cached weather is unreadable: {0}")]
    CacheReadCorrupt(String),
    #[error("Cache error: {0}")]
    Cache(#[from] DatabaseError),
}

impl WeatherError {
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed(message.into())
    }

    /// Corrupt cache reads are treated as an absent snapshot.
    pub fn is_cache_corrupt(&self) -> bool {
        matches!(
            self,
            Self::CacheReadCorrupt(_) | Self::Cache(DatabaseError::Corruption(_))
        )
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::Network(_))
    }
}

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        use skycast_core::WeatherError as Core;
        match err {
            WeatherError::LocationUnavailable => {
                AppError::Weather(Core::LocationNotFound("no coordinate".into()))
            }
            WeatherError::Location(e) => AppError::Weather(Core::LocationNotFound(e.to_string())),
            WeatherError::FetchFailed(msg) => AppError::Weather(Core::ApiError(msg)),
            WeatherError::Network(e) => AppError::Network(e),
            WeatherError::CacheReadCorrupt(msg) => {
                AppError::Database(DatabaseError::Corruption(msg))
            }
            WeatherError::Cache(e) => AppError::Database(e),
        }
    }
}
