//! Persistent snapshot of the last displayed weather.
//!
//! The store is a single global slot: every `save` replaces the previous
//! generation as a whole, and `load` never observes a mix of two generations.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use skycast_core::RusqliteErrorExt;

use crate::types::{WeatherError, WeatherSnapshot};

/// Keys of the persisted key/value layout.
pub mod keys {
    pub const SAVED_AT: &str = "savedAt";
    pub const CITY_NAME: &str = "cityName";
    pub const CURRENT_TEMP: &str = "currentTemp";
    pub const HIGH_TEMP: &str = "highTemp";
    pub const LOW_TEMP: &str = "lowTemp";
    pub const WEATHER_DESCRIPTION: &str = "weatherDescription";
    pub const WEATHER_IMAGE: &str = "weatherImage";
    pub const WEATHER_ICON: &str = "weatherIcon";
    pub const IS_CELSIUS: &str = "isCelsius";
}

/// Durable storage for the last weather snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read the persisted snapshot. `Ok(None)` if nothing was ever saved.
    fn load(&self) -> Result<Option<WeatherSnapshot>, WeatherError>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &WeatherSnapshot) -> Result<(), WeatherError>;

    /// The last persisted background image, regardless of snapshot age.
    fn last_image(&self) -> Result<Option<String>, WeatherError> {
        Ok(self.load()?.and_then(|s| s.weather_image))
    }
}

/// SQLite-backed snapshot store.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

fn db_error(e: rusqlite::Error) -> WeatherError {
    WeatherError::Cache(e.into_database_error())
}

impl SqliteSnapshotStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, WeatherError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WeatherError::Cache(skycast_core::DatabaseError::ConnectionFailed(
                        e.to_string(),
                    ))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(db_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, WeatherError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), WeatherError> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS preferences (
                    key TEXT PRIMARY KEY,
                    value TEXT
                );
                "#,
            )
            .map_err(db_error)
    }

    /// Remove the persisted snapshot.
    pub fn clear(&self) -> Result<(), WeatherError> {
        self.conn
            .lock()
            .execute("DELETE FROM preferences", [])
            .map_err(db_error)?;
        Ok(())
    }

    fn read_all(&self) -> Result<HashMap<String, Option<String>>, WeatherError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT key, value FROM preferences")
            .map_err(db_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(db_error)?;
        let values = rows.collect::<Result<HashMap<_, _>, _>>().map_err(db_error)?;
        Ok(values)
    }
}

fn parse_saved_at(raw: &str) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WeatherError::CacheReadCorrupt(format!("{}: {}", keys::SAVED_AT, e)))
}

fn parse_bool(raw: Option<&str>) -> Result<bool, WeatherError> {
    match raw {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(WeatherError::CacheReadCorrupt(format!(
            "{}: unexpected value {:?}",
            keys::IS_CELSIUS,
            other
        ))),
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self) -> Result<Option<WeatherSnapshot>, WeatherError> {
        let mut values = self.read_all()?;

        let saved_at = match values.remove(keys::SAVED_AT).flatten() {
            Some(raw) => parse_saved_at(&raw)?,
            None => return Ok(None),
        };
        let is_celsius = parse_bool(values.get(keys::IS_CELSIUS).and_then(|v| v.as_deref()))?;
        let mut text = |key: &str| values.remove(key).flatten();

        Ok(Some(WeatherSnapshot {
            city_name: text(keys::CITY_NAME),
            weather_description: text(keys::WEATHER_DESCRIPTION),
            weather_icon: text(keys::WEATHER_ICON),
            current_temp: text(keys::CURRENT_TEMP),
            high_temp: text(keys::HIGH_TEMP),
            low_temp: text(keys::LOW_TEMP),
            weather_image: text(keys::WEATHER_IMAGE),
            is_celsius,
            saved_at,
        }))
    }

    fn save(&self, snapshot: &WeatherSnapshot) -> Result<(), WeatherError> {
        let rows: [(&str, Option<String>); 9] = [
            (keys::SAVED_AT, Some(snapshot.saved_at.to_rfc3339())),
            (keys::CITY_NAME, snapshot.city_name.clone()),
            (keys::CURRENT_TEMP, snapshot.current_temp.clone()),
            (keys::HIGH_TEMP, snapshot.high_temp.clone()),
            (keys::LOW_TEMP, snapshot.low_temp.clone()),
            (keys::WEATHER_DESCRIPTION, snapshot.weather_description.clone()),
            (keys::WEATHER_IMAGE, snapshot.weather_image.clone()),
            (keys::WEATHER_ICON, snapshot.weather_icon.clone()),
            (keys::IS_CELSIUS, Some(snapshot.is_celsius.to_string())),
        ];

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_error)?;
        for (key, value) in &rows {
            tx.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;

        tracing::debug!("Saved weather snapshot at {}", snapshot.saved_at);
        Ok(())
    }

    fn last_image(&self) -> Result<Option<String>, WeatherError> {
        let value: Option<Option<String>> = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![keys::WEATHER_IMAGE],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        Ok(value.flatten())
    }
}

/// In-process snapshot store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<WeatherSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: WeatherSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<WeatherSnapshot>, WeatherError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, snapshot: &WeatherSnapshot) -> Result<(), WeatherError> {
        *self.slot.lock() = Some(snapshot.clone());
        Ok(())
    }
}
