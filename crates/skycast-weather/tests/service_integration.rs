//! Integration tests for WeatherServiceClient using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use skycast_weather::provider::API_KEY_HEADER;
use skycast_weather::{ForecastProvider, ImageProvider, WeatherServiceClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, api_key: &str) -> WeatherServiceClient {
    WeatherServiceClient::new(&server.uri(), api_key, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_forecast_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/forecast/Paris"))
        .and(header(API_KEY_HEADER, "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "overview": "Sunny",
            "currentTemperature": "22",
            "maxTemperature": "25",
            "minTemperature": "15"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let forecast = client(&mock_server, "secret")
        .forecast("Paris")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(forecast.overview, "Sunny");
    assert_eq!(forecast.current_temperature, "22");
    assert_eq!(forecast.max_temperature, "25");
    assert_eq!(forecast.min_temperature, "15");
}

#[tokio::test]
async fn test_forecast_not_found_is_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/forecast/Atlantis"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let forecast = client(&mock_server, "").forecast("Atlantis").await.unwrap();
    assert!(forecast.is_none());
}

#[tokio::test]
async fn test_forecast_server_error_is_fetch_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/forecast/Paris"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, "").forecast("Paris").await.unwrap_err();
    assert!(err.is_fetch_failure());
}

#[tokio::test]
async fn test_forecast_malformed_body_is_fetch_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/forecast/Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, "").forecast("Paris").await.unwrap_err();
    assert!(err.is_fetch_failure());
}

#[tokio::test]
async fn test_image_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/image"))
        .and(query_param("city", "Paris"))
        .and(query_param("description", "Light rain"))
        .and(header(API_KEY_HEADER, "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://images.example/paris-rain.jpg"
        })))
        .mount(&mock_server)
        .await;

    let image = client(&mock_server, "secret")
        .image("Paris", "Light rain")
        .await
        .unwrap();

    assert_eq!(image.as_deref(), Some("https://images.example/paris-rain.jpg"));
}

#[tokio::test]
async fn test_image_empty_url_is_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "" })))
        .mount(&mock_server)
        .await;

    let image = client(&mock_server, "").image("Paris", "Sunny").await.unwrap();
    assert!(image.is_none());
}
