use chrono::{FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::EncodeError;

/// Supplies the zone used to qualify the logger's unqualified local time.
pub trait TimeZoneResolver: Send + Sync + fmt::Debug {
    fn offset_for(&self, local: &NaiveDateTime) -> Result<FixedOffset, EncodeError>;
}

/// The host's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimeZone;

impl TimeZoneResolver for LocalTimeZone {
    fn offset_for(&self, local: &NaiveDateTime) -> Result<FixedOffset, EncodeError> {
        match Local.offset_from_local_datetime(local) {
            LocalResult::Single(offset) => Ok(offset.fix()),
            // Repeated wall-clock hour at a DST fall-back: take the earlier instant.
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.fix()),
            LocalResult::None => Err(EncodeError::TimeZone(format!(
                "{local} does not exist in the local time zone"
            ))),
        }
    }
}

/// A fixed UTC offset, independent of the host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeZone(pub FixedOffset);

impl FixedTimeZone {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }
}

impl TimeZoneResolver for FixedTimeZone {
    fn offset_for(&self, _local: &NaiveDateTime) -> Result<FixedOffset, EncodeError> {
        Ok(self.0)
    }
}

/// Zone selection as written in configuration: `local`, `utc`, or `+HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    pub fn resolver(&self) -> Box<dyn TimeZoneResolver> {
        match self {
            TimeZoneSetting::Local => Box::new(LocalTimeZone),
            TimeZoneSetting::Fixed(offset) => Box::new(FixedTimeZone(*offset)),
        }
    }
}

impl FromStr for TimeZoneSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_lowercase().as_str() {
            "local" => return Ok(TimeZoneSetting::Local),
            "utc" | "z" => return Ok(TimeZoneSetting::Fixed(FixedTimeZone::utc().0)),
            _ => {}
        }

        value
            .parse::<FixedOffset>()
            .map(TimeZoneSetting::Fixed)
            .map_err(|e| format!("Invalid time zone '{value}': {e}. Expected local, utc or +HH:MM"))
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSetting::Local => f.write_str("local"),
            TimeZoneSetting::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_fixed_time_zone_ignores_input() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let zone = FixedTimeZone(offset);
        assert_eq!(zone.offset_for(&naive(1)).unwrap(), offset);
        assert_eq!(zone.offset_for(&naive(23)).unwrap(), offset);
    }

    #[test]
    fn test_local_time_zone_resolves_ordinary_times() {
        assert!(LocalTimeZone.offset_for(&naive(12)).is_ok());
    }

    #[test]
    fn test_time_zone_setting_parsing() {
        assert_eq!("local".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::Local);
        assert_eq!(
            "UTC".parse::<TimeZoneSetting>().unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::east_opt(0).unwrap())
        );
        assert_eq!(
            "+05:30".parse::<TimeZoneSetting>().unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap())
        );
        assert_eq!(
            "-03:00".parse::<TimeZoneSetting>().unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::west_opt(3 * 3600).unwrap())
        );
        assert!("Mars/Olympus".parse::<TimeZoneSetting>().is_err());
    }

    #[test]
    fn test_time_zone_setting_display_round_trips() {
        for input in ["local", "+05:30", "-03:00"] {
            let setting: TimeZoneSetting = input.parse().unwrap();
            assert_eq!(setting.to_string(), input);
        }
    }
}
