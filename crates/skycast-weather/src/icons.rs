//! Icon lookup for free-text forecast descriptions.

use serde::{Deserialize, Serialize};

/// Weather condition categories recognised in forecast descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Unknown,
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Sleet,
    Thunderstorm,
}

/// Keyword table, checked in order. More specific conditions come first so
/// "thunderstorm with rain" is a thunderstorm, "snowstorm" is snow and
/// "partly cloudy" is not plain cloud.
const KEYWORDS: &[(&str, WeatherCondition)] = &[
    ("thunder", WeatherCondition::Thunderstorm),
    ("sleet", WeatherCondition::Sleet),
    ("freezing", WeatherCondition::Sleet),
    ("snow", WeatherCondition::Snow),
    ("blizzard", WeatherCondition::Snow),
    ("storm", WeatherCondition::Thunderstorm),
    ("drizzle", WeatherCondition::Drizzle),
    ("rain", WeatherCondition::Rain),
    ("shower", WeatherCondition::Rain),
    ("fog", WeatherCondition::Fog),
    ("mist", WeatherCondition::Fog),
    ("haze", WeatherCondition::Fog),
    ("partly", WeatherCondition::PartlyCloudy),
    ("scattered", WeatherCondition::PartlyCloudy),
    ("few clouds", WeatherCondition::PartlyCloudy),
    ("cloud", WeatherCondition::Cloudy),
    ("overcast", WeatherCondition::Cloudy),
    ("clear", WeatherCondition::Clear),
    ("sun", WeatherCondition::Clear),
    ("fair", WeatherCondition::Clear),
];

impl WeatherCondition {
    /// Classify a forecast description such as "Light Rain" or "Sunny".
    pub fn from_description(description: &str) -> Self {
        let text = description.trim().to_lowercase();
        if text.is_empty() {
            return Self::Unknown;
        }

        KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, condition)| *condition)
            .unwrap_or(Self::Unknown)
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Unknown => "cloud_sun",
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle => "cloud_rain",
            Self::Rain => "cloud_rain",
            Self::Snow => "cloud_snow",
            Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// Icon identifier for a forecast description.
pub fn icon_for_description(description: &str) -> &'static str {
    WeatherCondition::from_description(description).icon_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sunny_is_clear() {
        assert_eq!(WeatherCondition::from_description("Sunny"), WeatherCondition::Clear);
        assert_eq!(icon_for_description("Sunny"), "sun");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(
            WeatherCondition::from_description("  LIGHT RAIN "),
            WeatherCondition::Rain
        );
    }

    #[test]
    fn test_partly_cloudy_beats_cloudy() {
        assert_eq!(
            WeatherCondition::from_description("Partly Cloudy"),
            WeatherCondition::PartlyCloudy
        );
        assert_eq!(WeatherCondition::from_description("Cloudy"), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_thunder_beats_rain() {
        assert_eq!(
            WeatherCondition::from_description("Thunderstorm with heavy rain"),
            WeatherCondition::Thunderstorm
        );
    }

    #[test]
    fn test_snowstorm_is_snow() {
        assert_eq!(icon_for_description("Snowstorm"), "cloud_snow");
        assert_eq!(icon_for_description("Blizzard storm warning"), "cloud_snow");
        assert_eq!(icon_for_description("Storm"), "cloud_lightning");
    }

    #[test]
    fn test_drizzle_and_sleet() {
        assert_eq!(icon_for_description("Drizzle"), "cloud_rain");
        assert_eq!(
            WeatherCondition::from_description("Freezing rain"),
            WeatherCondition::Sleet
        );
    }

    #[test]
    fn test_fog_variants() {
        for text in ["Fog", "Mist", "Haze"] {
            assert_eq!(icon_for_description(text), "cloud_fog");
        }
    }

    #[test]
    fn test_unknown_defaults() {
        assert_eq!(WeatherCondition::from_description(""), WeatherCondition::Unknown);
        assert_eq!(
            WeatherCondition::from_description("Volcanic ash"),
            WeatherCondition::Unknown
        );
        assert_eq!(icon_for_description("Volcanic ash"), "cloud_sun");
    }
}
