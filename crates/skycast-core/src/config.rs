use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when the configured API key is empty.
pub const API_KEY_ENV: &str = "SKYCAST_WEATHER_API_KEY";

/// Environment variable that overrides the configured weather service URL.
pub const SERVICE_URL_ENV: &str = "SKYCAST_WEATHER_SERVICE_URL";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (also holds the snapshot cache)
    pub config_dir: PathBuf,

    /// Forecast and image service
    #[serde(default)]
    pub weather: WeatherServiceConfig,

    /// Where device coordinates come from
    #[serde(default)]
    pub location: LocationConfig,

    /// Reverse geocoding settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Display preferences
    #[serde(default)]
    pub display: DisplayConfig,

    /// Time-of-day background images
    #[serde(default)]
    pub background: BackgroundConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherServiceConfig {
    /// Base URL of the forecast/image service
    pub service_url: String,

    /// API key for the service. Left empty in the file, it is read from
    /// `SKYCAST_WEATHER_API_KEY` at load time.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for WeatherServiceConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:7071".to_string(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Source of device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Use the configured latitude/longitude
    Fixed,
    /// Look the location up from the public IP address
    #[default]
    Ip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::Ip,
            latitude: 0.0,
            longitude: 0.0,
            ip_lookup_url: default_ip_lookup_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub nominatim_url: String,
    pub user_agent: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: concat!("Skycast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show temperatures in Celsius until a cached preference says otherwise
    #[serde(default = "default_celsius")]
    pub celsius: bool,

    /// Delay before the first clock update
    #[serde(default = "default_clock_initial_delay_ms")]
    pub clock_initial_delay_ms: u64,

    /// Clock update period
    #[serde(default = "default_clock_period_secs")]
    pub clock_period_secs: u64,

    /// How long a cached snapshot may be shown on startup
    #[serde(default = "default_cache_validity_hours")]
    pub cache_validity_hours: u32,
}

fn default_celsius() -> bool {
    true
}

fn default_clock_initial_delay_ms() -> u64 {
    100
}

fn default_clock_period_secs() -> u64 {
    10
}

fn default_cache_validity_hours() -> u32 {
    24
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            celsius: default_celsius(),
            clock_initial_delay_ms: default_clock_initial_delay_ms(),
            clock_period_secs: default_clock_period_secs(),
            cache_validity_hours: default_cache_validity_hours(),
        }
    }
}

/// Background image per part of the day. Unset parts have no background.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub morning: Option<String>,
    pub afternoon: Option<String>,
    pub evening: Option<String>,
    pub night: Option<String>,
}

impl BackgroundConfig {
    pub fn is_configured(&self) -> bool {
        self.morning.is_some()
            || self.afternoon.is_some()
            || self.evening.is_some()
            || self.night.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            weather: WeatherServiceConfig::default(),
            location: LocationConfig::default(),
            geocoding: GeocodingConfig::default(),
            display: DisplayConfig::default(),
            background: BackgroundConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing.
    /// Environment overrides are applied after reading.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    fn apply_env_overrides(&mut self) {
        if self.weather.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.weather.api_key = key;
            }
        }
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.is_empty() {
                self.weather.service_url = url;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.service_url, "weather.service_url", &mut result);

        if self.weather.api_key.is_empty() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set {})", API_KEY_ENV),
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Request timeout must be greater than 0");
        }

        match self.location.source {
            LocationSource::Fixed => {
                if !(-90.0..=90.0).contains(&self.location.latitude) {
                    result.add_error("location.latitude", "Latitude must be within ±90");
                }
                if !(-180.0..=180.0).contains(&self.location.longitude) {
                    result.add_error("location.longitude", "Longitude must be within ±180");
                }
            }
            LocationSource::Ip => {
                validate_url(
                    &self.location.ip_lookup_url,
                    "location.ip_lookup_url",
                    &mut result,
                );
            }
        }

        validate_url(
            &self.geocoding.nominatim_url,
            "geocoding.nominatim_url",
            &mut result,
        );

        if self.display.clock_period_secs == 0 {
            result.add_error("display.clock_period_secs", "Clock period must be greater than 0");
        }

        if self.display.cache_validity_hours != default_cache_validity_hours() {
            result.add_warning(
                "display.cache_validity_hours",
                format!(
                    "Cached weather is normally shown for {} hours",
                    default_cache_validity_hours()
                ),
            );
        }

        result
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the snapshot cache database
    pub fn cache_path(&self) -> PathBuf {
        self.config_dir.join("weather.db")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }

            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let mut config = Config::default();
        config.weather.api_key.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_invalid_service_url() {
        let mut config = Config::default();
        config.weather.service_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.service_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.geocoding.nominatim_url = "ftp://example.com/reverse".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_fixed_location_out_of_range() {
        let mut config = Config::default();
        config.location.source = LocationSource::Fixed;
        config.location.latitude = 91.0;
        config.location.longitude = -200.0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
        assert!(result.errors.iter().any(|e| e.field == "location.longitude"));
    }

    #[test]
    fn test_zero_clock_period() {
        let mut config = Config::default();
        config.display.clock_period_secs = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_non_default_cache_validity_is_warning() {
        let mut config = Config::default();
        config.display.cache_validity_hours = 6;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "display.cache_validity_hours"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert!(config.display.celsius);
        assert_eq!(config.display.clock_period_secs, 10);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.location.source = LocationSource::Fixed;
        config.location.latitude = 48.8566;
        config.location.longitude = 2.3522;
        config.background.night = Some("https://img.example/night.jpg".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.location.source, LocationSource::Fixed);
        assert_eq!(loaded.location.latitude, 48.8566);
        assert!(loaded.background.is_configured());
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = \"/tmp/skycast\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.display.cache_validity_hours, 24);
        assert_eq!(loaded.location.source, LocationSource::Ip);
        assert!(!loaded.background.is_configured());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display\ncelsius = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
