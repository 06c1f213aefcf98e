//! Optional time-of-day background images.

use chrono::{NaiveTime, Timelike};
use skycast_core::BackgroundConfig;

/// Picks a background image for a local time of day.
pub trait TimeOfDayImageProvider: Send + Sync {
    fn image_for_time(&self, time: NaiveTime) -> Option<String>;
}

/// Parts of the day a background can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub fn from_time(time: NaiveTime) -> Self {
        match time.hour() {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }
}

/// Background images taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTimeOfDayImages {
    config: BackgroundConfig,
}

impl ConfiguredTimeOfDayImages {
    /// `None` when no part of the day has an image.
    pub fn from_config(config: &BackgroundConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            config: config.clone(),
        })
    }
}

impl TimeOfDayImageProvider for ConfiguredTimeOfDayImages {
    fn image_for_time(&self, time: NaiveTime) -> Option<String> {
        match DayPart::from_time(time) {
            DayPart::Morning => self.config.morning.clone(),
            DayPart::Afternoon => self.config.afternoon.clone(),
            DayPart::Evening => self.config.evening.clone(),
            DayPart::Night => self.config.night.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 30, 0).unwrap()
    }

    #[test]
    fn test_day_part_boundaries() {
        assert_eq!(DayPart::from_time(at(4)), DayPart::Night);
        assert_eq!(DayPart::from_time(at(5)), DayPart::Morning);
        assert_eq!(DayPart::from_time(at(12)), DayPart::Afternoon);
        assert_eq!(DayPart::from_time(at(17)), DayPart::Evening);
        assert_eq!(DayPart::from_time(at(21)), DayPart::Night);
    }

    #[test]
    fn test_unconfigured_yields_no_provider() {
        assert!(ConfiguredTimeOfDayImages::from_config(&BackgroundConfig::default()).is_none());
    }

    #[test]
    fn test_partial_configuration() {
        let images = ConfiguredTimeOfDayImages::from_config(&BackgroundConfig {
            night: Some("night.jpg".into()),
            ..BackgroundConfig::default()
        })
        .unwrap();

        assert_eq!(images.image_for_time(at(23)).as_deref(), Some("night.jpg"));
        assert_eq!(images.image_for_time(at(9)), None);
    }
}
