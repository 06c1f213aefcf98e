//! Device location sources.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::ReqwestErrorExt;

use crate::types::{Coordinate, LocationError, WeatherError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Supplies the device coordinate.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// A previously obtained fix, returned without waiting. May be stale or absent.
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError>;

    /// A fresh fix. Slower, and may fail for platform or permission reasons.
    async fn current_location(&self) -> Result<Option<Coordinate>, LocationError>;
}

/// A location that never moves, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinate: Coordinate,
}

impl FixedLocationProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
        Ok(Some(self.coordinate))
    }

    async fn current_location(&self) -> Result<Option<Coordinate>, LocationError> {
        Ok(Some(self.coordinate))
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximate location from the public IP address (ip-api.com response shape).
///
/// The last successful lookup is kept in memory and served as the last-known fix.
pub struct IpLocationProvider {
    client: Client,
    lookup_url: String,
    last_fix: Mutex<Option<Coordinate>>,
}

impl IpLocationProvider {
    pub fn new(lookup_url: impl Into<String>, user_agent: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            lookup_url: lookup_url.into(),
            last_fix: Mutex::new(None),
        })
    }
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
        Ok(*self.last_fix.lock())
    }

    async fn current_location(&self) -> Result<Option<Coordinate>, LocationError> {
        let response = self
            .client
            .get(&self.lookup_url)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(e.into_network_error().to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Unavailable(format!(
                "IP lookup returned status {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(e.into_network_error().to_string()))?;

        if body.status.as_deref() == Some("fail") {
            tracing::debug!(
                "IP lookup could not locate this address: {}",
                body.message.as_deref().unwrap_or("no reason given")
            );
            return Ok(None);
        }

        let fix = match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => return Ok(None),
        };

        tracing::info!("Got location: {}, {}", fix.latitude, fix.longitude);
        *self.last_fix.lock() = Some(fix);
        Ok(Some(fix))
    }
}
