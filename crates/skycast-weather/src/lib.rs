//! Weather refresh for Skycast
//!
//! Resolves the device location to a city, fetches its forecast and a
//! background image, and keeps the last displayed weather in a local
//! snapshot cache that is shown on startup while it is less than a day old.

pub mod types;
pub mod background;
pub mod cache;
pub mod clock;
pub mod geocode;
pub mod icons;
pub mod location;
pub mod provider;
pub mod state;
pub mod viewmodel;

pub use types::*;
pub use background::{ConfiguredTimeOfDayImages, TimeOfDayImageProvider};
pub use cache::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use clock::ClockTicker;
pub use geocode::{NominatimPlaceResolver, PlaceResolver};
pub use icons::{icon_for_description, WeatherCondition};
pub use location::{FixedLocationProvider, IpLocationProvider, LocationProvider};
pub use provider::{ForecastProvider, ImageProvider, WeatherServiceClient};
pub use state::{ObservableState, Property, PropertyChanged, PropertyValue, WeatherState};
pub use viewmodel::{
    RefreshOutcome, ViewModelOptions, WeatherServices, WeatherViewModel,
    FEATURE_UNSUPPORTED_MESSAGE, PERMISSION_DENIED_MESSAGE,
};
