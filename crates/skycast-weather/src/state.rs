//! Observable weather display state.
//!
//! Each write that changes a value notifies subscribers with a
//! [`PropertyChanged`]. Once disposed, writes are dropped and nobody is
//! notified.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::types::WeatherSnapshot;

/// Observable fields of the weather screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    CityName,
    WeatherDescription,
    WeatherIcon,
    CurrentTemp,
    HighTemp,
    LowTemp,
    WeatherImage,
    IsCelsius,
    Time,
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CityName => "cityName",
            Self::WeatherDescription => "weatherDescription",
            Self::WeatherIcon => "weatherIcon",
            Self::CurrentTemp => "currentTemp",
            Self::HighTemp => "highTemp",
            Self::LowTemp => "lowTemp",
            Self::WeatherImage => "weatherImage",
            Self::IsCelsius => "isCelsius",
            Self::Time => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(Option<String>),
    Flag(bool),
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(Some(text)) => write!(f, "{}", text),
            Self::Text(None) => write!(f, "<unset>"),
            Self::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

/// Notification sent to subscribers after a field changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChanged {
    pub property: Property,
    pub value: PropertyValue,
}

/// Plain copy of every observable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherState {
    pub city_name: Option<String>,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,
    pub current_temp: Option<String>,
    pub high_temp: Option<String>,
    pub low_temp: Option<String>,
    pub weather_image: Option<String>,
    pub is_celsius: bool,
    pub time: Option<String>,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            city_name: None,
            weather_description: None,
            weather_icon: None,
            current_temp: None,
            high_temp: None,
            low_temp: None,
            weather_image: None,
            is_celsius: true,
            time: None,
        }
    }
}

impl WeatherState {
    /// Sample content for design-time previews.
    pub fn preview() -> Self {
        Self {
            city_name: Some("London".into()),
            weather_description: Some("Cloudy".into()),
            weather_icon: Some(crate::icons::icon_for_description("Cloudy").into()),
            current_temp: Some("17".into()),
            high_temp: Some("20".into()),
            low_temp: Some("10".into()),
            weather_image: Some(
                "https://upload.wikimedia.org/wikipedia/commons/8/82/London_Big_Ben_Phone_box.jpg"
                    .into(),
            ),
            is_celsius: true,
            time: None,
        }
    }

    pub fn temp_symbol(&self) -> &'static str {
        if self.is_celsius {
            "°C"
        } else {
            "°F"
        }
    }

    pub fn to_snapshot(&self, saved_at: DateTime<Utc>) -> WeatherSnapshot {
        WeatherSnapshot {
            city_name: self.city_name.clone(),
            weather_description: self.weather_description.clone(),
            weather_icon: self.weather_icon.clone(),
            current_temp: self.current_temp.clone(),
            high_temp: self.high_temp.clone(),
            low_temp: self.low_temp.clone(),
            weather_image: self.weather_image.clone(),
            is_celsius: self.is_celsius,
            saved_at,
        }
    }

    fn text_mut(&mut self, property: Property) -> Option<&mut Option<String>> {
        match property {
            Property::CityName => Some(&mut self.city_name),
            Property::WeatherDescription => Some(&mut self.weather_description),
            Property::WeatherIcon => Some(&mut self.weather_icon),
            Property::CurrentTemp => Some(&mut self.current_temp),
            Property::HighTemp => Some(&mut self.high_temp),
            Property::LowTemp => Some(&mut self.low_temp),
            Property::WeatherImage => Some(&mut self.weather_image),
            Property::Time => Some(&mut self.time),
            Property::IsCelsius => None,
        }
    }
}

struct Inner {
    state: WeatherState,
    subscribers: Vec<mpsc::UnboundedSender<PropertyChanged>>,
    disposed: bool,
}

impl Inner {
    fn notify(&mut self, property: Property, value: PropertyValue) {
        let change = PropertyChanged { property, value };
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    fn write_text(&mut self, property: Property, value: Option<String>) -> bool {
        if self.disposed {
            tracing::debug!("Ignoring write to {} after dispose", property.name());
            return false;
        }
        let Some(slot) = self.state.text_mut(property) else {
            return false;
        };
        if *slot == value {
            return false;
        }
        slot.clone_from(&value);
        self.notify(property, PropertyValue::Text(value));
        true
    }

    fn write_flag(&mut self, value: bool) -> bool {
        if self.disposed {
            tracing::debug!("Ignoring write to isCelsius after dispose");
            return false;
        }
        if self.state.is_celsius == value {
            return false;
        }
        self.state.is_celsius = value;
        self.notify(Property::IsCelsius, PropertyValue::Flag(value));
        true
    }
}

/// Shared, observable weather display state.
pub struct ObservableState {
    inner: Mutex<Inner>,
}

impl Default for ObservableState {
    fn default() -> Self {
        Self::new(WeatherState::default())
    }
}

impl ObservableState {
    pub fn new(initial: WeatherState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: initial,
                subscribers: Vec::new(),
                disposed: false,
            }),
        }
    }

    /// Receive a notification for every subsequent change.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PropertyChanged> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Copy of all fields.
    pub fn current(&self) -> WeatherState {
        self.inner.lock().state.clone()
    }

    /// All fields captured under one lock, stamped with `saved_at`.
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> WeatherSnapshot {
        self.inner.lock().state.to_snapshot(saved_at)
    }

    pub fn set_text(&self, property: Property, value: Option<String>) -> bool {
        self.inner.lock().write_text(property, value)
    }

    pub fn set_city_name(&self, value: Option<String>) -> bool {
        self.set_text(Property::CityName, value)
    }

    pub fn set_weather_image(&self, value: Option<String>) -> bool {
        self.set_text(Property::WeatherImage, value)
    }

    pub fn set_time(&self, value: Option<String>) -> bool {
        self.set_text(Property::Time, value)
    }

    pub fn set_is_celsius(&self, value: bool) -> bool {
        self.inner.lock().write_flag(value)
    }

    /// Populate every persisted field from a snapshot.
    pub fn apply_snapshot(&self, snapshot: &WeatherSnapshot) {
        let mut inner = self.inner.lock();
        inner.write_text(Property::CityName, snapshot.city_name.clone());
        inner.write_text(Property::CurrentTemp, snapshot.current_temp.clone());
        inner.write_text(Property::HighTemp, snapshot.high_temp.clone());
        inner.write_text(Property::LowTemp, snapshot.low_temp.clone());
        inner.write_text(
            Property::WeatherDescription,
            snapshot.weather_description.clone(),
        );
        inner.write_text(Property::WeatherIcon, snapshot.weather_icon.clone());
        inner.write_flag(snapshot.is_celsius);
    }

    /// Stop accepting writes and drop all subscribers.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        inner.disposed = true;
        inner.subscribers.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<PropertyChanged>) -> Vec<PropertyChanged> {
        let mut changes = Vec::new();
        while let Ok(change) = rx.try_recv() {
            changes.push(change);
        }
        changes
    }

    #[test]
    fn test_change_notifies_subscriber() {
        let state = ObservableState::default();
        let mut rx = state.subscribe();

        assert!(state.set_city_name(Some("Paris".into())));

        let changes = drain(&mut rx);
        assert_eq!(
            changes,
            vec![PropertyChanged {
                property: Property::CityName,
                value: PropertyValue::Text(Some("Paris".into())),
            }]
        );
    }

    #[test]
    fn test_same_value_does_not_notify() {
        let state = ObservableState::default();
        state.set_city_name(Some("Paris".into()));
        let mut rx = state.subscribe();

        assert!(!state.set_city_name(Some("Paris".into())));
        assert!(!state.set_is_celsius(true));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_dispose_blocks_writes() {
        let state = ObservableState::default();
        let mut rx = state.subscribe();
        state.dispose();

        assert!(!state.set_city_name(Some("Late".into())));
        assert!(!state.set_is_celsius(false));
        assert_eq!(state.current().city_name, None);
        assert!(state.current().is_celsius);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let state = ObservableState::default();
        let rx = state.subscribe();
        drop(rx);

        assert!(state.set_time(Some("9:41 AM".into())));
        assert!(state.inner.lock().subscribers.is_empty());
    }

    #[test]
    fn test_apply_snapshot_leaves_image_untouched() {
        let state = ObservableState::default();
        let snapshot = WeatherState::preview().to_snapshot(Utc::now());

        state.apply_snapshot(&snapshot);

        let current = state.current();
        assert_eq!(current.city_name.as_deref(), Some("London"));
        assert_eq!(current.high_temp.as_deref(), Some("20"));
        assert_eq!(current.weather_image, None);
    }

    #[test]
    fn test_snapshot_reflects_current_fields() {
        let state = ObservableState::new(WeatherState::preview());
        let now = Utc::now();
        let snapshot = state.snapshot(now);
        assert_eq!(snapshot, WeatherState::preview().to_snapshot(now));
    }

    #[test]
    fn test_temp_symbol() {
        let mut state = WeatherState::default();
        assert_eq!(state.temp_symbol(), "°C");
        state.is_celsius = false;
        assert_eq!(state.temp_symbol(), "°F");
    }
}
