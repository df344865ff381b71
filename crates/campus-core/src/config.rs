use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};

use crate::days::Locale;
use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
/// UTC-04:00, no daylight saving.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -240;

#[derive(Debug, Clone)]
pub struct CampusConfig {
    pub database_path: PathBuf,
    /// Reference zone for day grouping.
    pub zone: FixedOffset,
    pub locale: Locale,
    pub page_size: u32,
    pub event_capacity: usize,
}

impl CampusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_path = lookup("CAMPUS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let zone = match lookup("CAMPUS_UTC_OFFSET_MINUTES") {
            Some(raw) => {
                let minutes: i32 = parse("CAMPUS_UTC_OFFSET_MINUTES", &raw)?;
                zone_from_minutes(minutes).ok_or_else(|| ConfigError::Invalid {
                    key: "CAMPUS_UTC_OFFSET_MINUTES",
                    value: raw,
                    reason: "offset must be within ±24 hours".into(),
                })?
            }
            None => defaults.zone,
        };

        let locale = match lookup("CAMPUS_LOCALE") {
            Some(raw) => raw.parse::<Locale>().map_err(|reason| ConfigError::Invalid {
                key: "CAMPUS_LOCALE",
                value: raw,
                reason,
            })?,
            None => defaults.locale,
        };

        let page_size = match lookup("CAMPUS_PAGE_SIZE") {
            Some(raw) => parse::<u32>("CAMPUS_PAGE_SIZE", &raw)?.clamp(1, MAX_PAGE_SIZE),
            None => defaults.page_size,
        };

        let event_capacity = match lookup("CAMPUS_EVENT_CAPACITY") {
            Some(raw) => match parse::<usize>("CAMPUS_EVENT_CAPACITY", &raw)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        key: "CAMPUS_EVENT_CAPACITY",
                        value: raw,
                        reason: "capacity must be at least 1".into(),
                    });
                }
                n => n,
            },
            None => defaults.event_capacity,
        };

        Ok(Self {
            database_path,
            zone,
            locale,
            page_size,
            event_capacity,
        })
    }
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("campus.db"),
            zone: default_zone(),
            locale: Locale::default(),
            page_size: DEFAULT_PAGE_SIZE,
            event_capacity: campus_events::dispatcher::DEFAULT_CAPACITY,
        }
    }
}

pub fn zone_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn default_zone() -> FixedOffset {
    zone_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| Utc.fix())
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
