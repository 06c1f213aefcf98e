//! Forecast and background-image lookups against the weather service.
//!
//! Both lookups are single-attempt: a failure is reported to the caller and
//! never retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use skycast_core::{ReqwestErrorExt, WeatherServiceConfig};
use url::Url;

use crate::types::{Forecast, WeatherError};

/// Header carrying the service API key.
pub const API_KEY_HEADER: &str = "x-functions-key";

/// Fetches the forecast for a city.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// `Ok(None)` when the service has no forecast for the city.
    async fn forecast(&self, city_name: &str) -> Result<Option<Forecast>, WeatherError>;
}

/// Fetches a representative image for a city and forecast description.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn image(
        &self,
        city_name: &str,
        description: &str,
    ) -> Result<Option<String>, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: Option<String>,
}

/// HTTP client for the forecast/image service.
#[derive(Debug, Clone)]
pub struct WeatherServiceClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl WeatherServiceClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WeatherError::fetch_failed(format!("invalid service URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Skycast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &WeatherServiceConfig) -> Result<Self, WeatherError> {
        Self::new(
            &config.service_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, WeatherError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WeatherError::fetch_failed("service URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.header(API_KEY_HEADER, &self.api_key)
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<reqwest::Response>, WeatherError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => Err(WeatherError::fetch_failed(format!(
                "weather service returned status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl ForecastProvider for WeatherServiceClient {
    async fn forecast(&self, city_name: &str) -> Result<Option<Forecast>, WeatherError> {
        let url = self.endpoint(&["api", "forecast", city_name])?;
        tracing::debug!("Fetching forecast for {}", city_name);

        let Some(response) = self.send(self.client.get(url)).await? else {
            tracing::info!("No forecast available for {}", city_name);
            return Ok(None);
        };

        let forecast = response
            .json::<Forecast>()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;
        Ok(Some(forecast))
    }
}

#[async_trait]
impl ImageProvider for WeatherServiceClient {
    async fn image(
        &self,
        city_name: &str,
        description: &str,
    ) -> Result<Option<String>, WeatherError> {
        let url = self.endpoint(&["api", "image"])?;
        let request = self
            .client
            .get(url)
            .query(&[("city", city_name), ("description", description)]);

        let Some(response) = self.send(request).await? else {
            return Ok(None);
        };

        let body = response
            .json::<ImageResponse>()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;
        Ok(body.url.filter(|u| !u.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn client(base: &str) -> WeatherServiceClient {
        WeatherServiceClient::new(base, "", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_city() {
        let url = client("https://weather.example")
            .endpoint(&["api", "forecast", "São Paulo"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://weather.example/api/forecast/S%C3%A3o%20Paulo"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = client("https://weather.example/v2/")
            .endpoint(&["api", "image"])
            .unwrap();
        assert_eq!(url.as_str(), "https://weather.example/v2/api/image");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = WeatherServiceClient::new("not a url", "", Duration::from_secs(5)).unwrap_err();
        assert!(err.is_fetch_failure());
    }
}
