//! Weather screen view-model: refresh pipeline over the injected providers.
//!
//! One activation runs, in order: cached-state load, coordinate lookup
//! (last-known first), reverse geocode, forecast, background image, and a
//! snapshot save. Errors never escape; they become a city-field message or a
//! logged no-op, and the image field always falls back to the last persisted
//! image.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use parking_lot::Mutex;
use skycast_core::{Config, DisplayConfig, LocationSource};
use tokio::sync::mpsc;

use crate::background::{ConfiguredTimeOfDayImages, TimeOfDayImageProvider};
use crate::cache::SnapshotStore;
use crate::clock::{ClockTicker, DEFAULT_INITIAL_DELAY, DEFAULT_PERIOD};
use crate::geocode::{NominatimPlaceResolver, PlaceResolver};
use crate::icons::icon_for_description;
use crate::location::{FixedLocationProvider, IpLocationProvider, LocationProvider};
use crate::provider::{ForecastProvider, ImageProvider, WeatherServiceClient};
use crate::state::{ObservableState, Property, PropertyChanged, WeatherState};
use crate::types::{
    Coordinate, Forecast, LocationError, WeatherError, SNAPSHOT_VALIDITY_HOURS,
};

/// City-field text when the device cannot provide a location at all.
pub const FEATURE_UNSUPPORTED_MESSAGE: &str =
    "Unable to retrieve location - Feature not supported";

/// City-field text when location access was refused.
pub const PERMISSION_DENIED_MESSAGE: &str = "Unable to retrieve location - Need permission";

/// Collaborators the view-model talks to.
#[derive(Clone)]
pub struct WeatherServices {
    pub location: Arc<dyn LocationProvider>,
    pub places: Arc<dyn PlaceResolver>,
    pub forecasts: Arc<dyn ForecastProvider>,
    pub images: Arc<dyn ImageProvider>,
    /// Best-effort; absent when no time-of-day images are available.
    pub time_of_day: Option<Arc<dyn TimeOfDayImageProvider>>,
}

impl WeatherServices {
    /// Build the network-backed providers described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let user_agent = config.geocoding.user_agent.as_str();

        let location: Arc<dyn LocationProvider> = match config.location.source {
            LocationSource::Fixed => Arc::new(FixedLocationProvider::new(Coordinate::new(
                config.location.latitude,
                config.location.longitude,
            ))),
            LocationSource::Ip => Arc::new(IpLocationProvider::new(
                config.location.ip_lookup_url.clone(),
                user_agent,
            )?),
        };

        let places = Arc::new(NominatimPlaceResolver::new(
            config.geocoding.nominatim_url.clone(),
            user_agent,
        )?);

        let service = Arc::new(WeatherServiceClient::from_config(&config.weather)?);

        let time_of_day = ConfiguredTimeOfDayImages::from_config(&config.background)
            .map(|images| Arc::new(images) as Arc<dyn TimeOfDayImageProvider>);

        Ok(Self {
            location,
            places,
            forecasts: service.clone(),
            images: service,
            time_of_day,
        })
    }
}

/// Tunables for the view-model.
#[derive(Debug, Clone)]
pub struct ViewModelOptions {
    /// Maximum age of a snapshot surfaced on activation
    pub cache_validity: chrono::Duration,
    pub clock_initial_delay: Duration,
    pub clock_period: Duration,
    /// Unit shown before any cached preference is loaded
    pub celsius: bool,
}

impl Default for ViewModelOptions {
    fn default() -> Self {
        Self {
            cache_validity: chrono::Duration::hours(SNAPSHOT_VALIDITY_HOURS),
            clock_initial_delay: DEFAULT_INITIAL_DELAY,
            clock_period: DEFAULT_PERIOD,
            celsius: true,
        }
    }
}

impl ViewModelOptions {
    pub fn from_config(display: &DisplayConfig) -> Self {
        Self {
            cache_validity: chrono::Duration::hours(i64::from(display.cache_validity_hours)),
            clock_initial_delay: Duration::from_millis(display.clock_initial_delay_ms),
            clock_period: Duration::from_secs(display.clock_period_secs),
            celsius: display.celsius,
        }
    }
}

/// How a refresh cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Location, place and forecast stages ran and the snapshot was saved
    Refreshed,
    /// No coordinate was available; the current fields were saved as they were
    NoLocation,
    /// The device lacks location support; the city field shows a message
    FeatureUnsupported,
    /// Location access was refused; the city field shows a message
    PermissionDenied,
    /// Some other stage failed; the error was logged and the cycle abandoned
    Failed,
    /// Another cycle was already in flight; nothing was touched
    AlreadyRunning,
    /// The view-model was torn down; late results were discarded
    Disposed,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// View-model for the weather screen.
pub struct WeatherViewModel {
    state: Arc<ObservableState>,
    store: Arc<dyn SnapshotStore>,
    services: WeatherServices,
    options: ViewModelOptions,
    in_flight: AtomicBool,
    clock: Mutex<Option<ClockTicker>>,
}

impl WeatherViewModel {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        services: WeatherServices,
        options: ViewModelOptions,
    ) -> Self {
        let initial = WeatherState {
            is_celsius: options.celsius,
            ..WeatherState::default()
        };

        Self {
            state: Arc::new(ObservableState::new(initial)),
            store,
            services,
            options,
            in_flight: AtomicBool::new(false),
            clock: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<ObservableState> {
        &self.state
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PropertyChanged> {
        self.state.subscribe()
    }

    pub fn current(&self) -> WeatherState {
        self.state.current()
    }

    pub fn temp_symbol(&self) -> &'static str {
        self.state.current().temp_symbol()
    }

    pub fn set_celsius(&self, celsius: bool) {
        self.state.set_is_celsius(celsius);
    }

    /// Time-of-day background for the current local time, if a provider is wired.
    pub fn background_image(&self) -> Option<String> {
        self.services
            .time_of_day
            .as_ref()
            .and_then(|images| images.image_for_time(Local::now().time()))
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start the periodic clock. Must be called inside a tokio runtime.
    pub fn start_clock(&self) {
        if self.state.is_disposed() {
            return;
        }
        let mut clock = self.clock.lock();
        if clock.is_none() {
            *clock = Some(ClockTicker::start(
                self.state.clone(),
                self.options.clock_initial_delay,
                self.options.clock_period,
            ));
        }
    }

    /// Tear down: stop the clock and refuse every later field write.
    pub fn dispose(&self) {
        if let Some(mut clock) = self.clock.lock().take() {
            clock.stop();
        }
        self.state.dispose();
        tracing::debug!("Weather view-model disposed");
    }

    /// Populate the fields from the persisted snapshot if it is still fresh.
    ///
    /// Returns whether cached values were applied.
    pub fn load_cached_state(&self) -> bool {
        match self.store.load() {
            Ok(Some(snapshot)) if snapshot.is_fresh(Utc::now(), self.options.cache_validity) => {
                tracing::info!("Using cached weather from {}", snapshot.saved_at);
                self.state.apply_snapshot(&snapshot);
                true
            }
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    "Cached weather is {} hours old, not shown",
                    snapshot.age(Utc::now()).num_hours()
                );
                false
            }
            Ok(None) => false,
            Err(e) if e.is_cache_corrupt() => {
                tracing::warn!("Ignoring unreadable weather cache: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to read weather cache: {}", e);
                false
            }
        }
    }

    /// Full activation: cached state first, then a refresh cycle.
    pub async fn activate(&self) -> RefreshOutcome {
        self.run_cycle(true).await
    }

    /// A refresh cycle without reloading the cache first.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.run_cycle(false).await
    }

    async fn run_cycle(&self, load_cache: bool) -> RefreshOutcome {
        if self.state.is_disposed() {
            return RefreshOutcome::Disposed;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Weather refresh already in progress, ignoring activation");
            return RefreshOutcome::AlreadyRunning;
        };

        if load_cache {
            self.load_cached_state();
        }

        let outcome = match self.fetch_and_store().await {
            Ok(outcome) => outcome,
            Err(WeatherError::Location(LocationError::FeatureUnsupported)) => {
                self.state
                    .set_city_name(Some(FEATURE_UNSUPPORTED_MESSAGE.to_string()));
                RefreshOutcome::FeatureUnsupported
            }
            Err(WeatherError::Location(LocationError::PermissionDenied)) => {
                self.state
                    .set_city_name(Some(PERMISSION_DENIED_MESSAGE.to_string()));
                RefreshOutcome::PermissionDenied
            }
            Err(e) => {
                tracing::error!("Weather refresh failed: {}", e);
                RefreshOutcome::Failed
            }
        };

        self.fall_back_to_cached_image();

        if self.state.is_disposed() {
            RefreshOutcome::Disposed
        } else {
            outcome
        }
    }

    async fn fetch_and_store(&self) -> Result<RefreshOutcome, WeatherError> {
        let outcome = match self.resolve_coordinate().await? {
            Some(coordinate) => {
                self.refresh_for(coordinate).await?;
                RefreshOutcome::Refreshed
            }
            None => {
                tracing::info!(
                    "{}, keeping current weather",
                    WeatherError::LocationUnavailable
                );
                RefreshOutcome::NoLocation
            }
        };

        if self.state.is_disposed() {
            tracing::debug!("View-model disposed during refresh, not saving");
            return Ok(RefreshOutcome::Disposed);
        }

        // An imageless save must not erase the stored background.
        self.fall_back_to_cached_image();
        self.store.save(&self.state.snapshot(Utc::now()))?;
        Ok(outcome)
    }

    async fn resolve_coordinate(&self) -> Result<Option<Coordinate>, WeatherError> {
        if let Some(coordinate) = self.services.location.last_known_location().await? {
            tracing::debug!("Using last known location");
            return Ok(Some(coordinate));
        }

        tracing::debug!("No last known location, requesting a fresh fix");
        Ok(self.services.location.current_location().await?)
    }

    async fn refresh_for(&self, coordinate: Coordinate) -> Result<(), WeatherError> {
        let places = self.services.places.resolve(coordinate).await?;
        let city = places
            .into_iter()
            .next()
            .and_then(|place| place.city_name)
            .ok_or_else(|| {
                WeatherError::fetch_failed(format!(
                    "no place found for {}, {}",
                    coordinate.latitude, coordinate.longitude
                ))
            })?;

        self.state.set_city_name(Some(city.clone()));

        let Some(forecast) = self.services.forecasts.forecast(&city).await? else {
            tracing::info!("No forecast returned for {}", city);
            return Ok(());
        };

        self.apply_forecast(&forecast);

        let image = self
            .services
            .images
            .image(&city, &forecast.overview)
            .await?;
        self.state.set_weather_image(image);
        Ok(())
    }

    fn apply_forecast(&self, forecast: &Forecast) {
        let state = &self.state;
        state.set_text(
            Property::WeatherDescription,
            Some(forecast.overview.clone()),
        );
        state.set_text(
            Property::WeatherIcon,
            Some(icon_for_description(&forecast.overview).to_string()),
        );
        state.set_text(
            Property::CurrentTemp,
            Some(forecast.current_temperature.clone()),
        );
        state.set_text(Property::HighTemp, Some(forecast.max_temperature.clone()));
        state.set_text(Property::LowTemp, Some(forecast.min_temperature.clone()));
    }

    fn fall_back_to_cached_image(&self) {
        let has_image = self
            .state
            .current()
            .weather_image
            .is_some_and(|image| !image.is_empty());
        if has_image {
            return;
        }

        match self.store.last_image() {
            Ok(image) => {
                self.state.set_weather_image(image);
            }
            Err(e) => tracing::warn!("Could not read cached weather image: {}", e),
        }
    }
}

impl Drop for WeatherViewModel {
    fn drop(&mut self) {
        if let Some(mut clock) = self.clock.get_mut().take() {
            clock.stop();
        }
    }
}
