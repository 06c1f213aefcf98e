//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::ReqwestErrorExt;

use crate::types::{Coordinate, Place, WeatherError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Resolves a coordinate to candidate places, best match first.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, coordinate: Coordinate) -> Result<Vec<Place>, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    fn into_place(self) -> Place {
        // Prefer city > town > village > municipality > county, skipping blanks
        let city_name = [
            self.city,
            self.town,
            self.village,
            self.municipality,
            self.county,
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty());

        Place {
            city_name,
            region: self.state,
            country: self.country,
        }
    }
}

/// Nominatim reverse geocoder.
#[derive(Debug, Clone)]
pub struct NominatimPlaceResolver {
    client: Client,
    base_url: String,
}

impl NominatimPlaceResolver {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PlaceResolver for NominatimPlaceResolver {
    async fn resolve(&self, coordinate: Coordinate) -> Result<Vec<Place>, WeatherError> {
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("zoom", "10"),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        if !response.status().is_success() {
            return Err(WeatherError::fetch_failed(format!(
                "reverse geocode returned status {}",
                response.status()
            )));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        if let Some(error) = body.error {
            tracing::debug!("Reverse geocode found nothing: {}", error);
            return Ok(Vec::new());
        }

        let places: Vec<Place> = body
            .address
            .map(NominatimAddress::into_place)
            .into_iter()
            .collect();
        if let Some(name) = places.first().and_then(|p| p.city_name.as_deref()) {
            tracing::info!("Reverse geocoded to: {}", name);
        }
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn address(json: serde_json::Value) -> NominatimAddress {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_city_preferred_over_town() {
        let place = address(serde_json::json!({
            "city": "Paris",
            "town": "Montmartre",
            "state": "Île-de-France",
            "country": "France"
        }))
        .into_place();
        assert_eq!(place.city_name.as_deref(), Some("Paris"));
        assert_eq!(place.country.as_deref(), Some("France"));
    }

    #[test]
    fn test_falls_back_to_village() {
        let place = address(serde_json::json!({ "village": "Hallstatt" })).into_place();
        assert_eq!(place.city_name.as_deref(), Some("Hallstatt"));
    }

    #[test]
    fn test_blank_city_falls_through_to_town() {
        let place = address(serde_json::json!({ "city": "", "town": "Chamonix" })).into_place();
        assert_eq!(place.city_name.as_deref(), Some("Chamonix"));
    }

    #[test]
    fn test_no_locality_leaves_city_empty() {
        let place =
            address(serde_json::json!({ "state": "Nevada", "country": "USA" })).into_place();
        assert!(place.city_name.is_none());
        assert_eq!(place.region.as_deref(), Some("Nevada"));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -p skycast-weather -- --ignored
    async fn test_reverse_geocode_seattle() {
        let resolver = NominatimPlaceResolver::new(
            "https://nominatim.openstreetmap.org/reverse",
            "Skycast/0.1.0",
        )
        .unwrap();
        let places = resolver
            .resolve(Coordinate::new(47.6062, -122.3321))
            .await
            .unwrap();
        let name = places[0].city_name.clone().unwrap();
        assert!(name.to_lowercase().contains("seattle"));
    }
}
