use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CF-style time axis: "<unit> since <epoch>"
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeUnitsError {
    #[error("time units '{0}' are not of the form '<unit> since <epoch>'")]
    Malformed(String),
    #[error("unsupported time unit '{0}'")]
    UnknownUnit(String),
    #[error("cannot parse epoch '{0}'")]
    BadEpoch(String),
}

/// Converts raw values of a `time` variable into UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    epoch: NaiveDateTime,
    seconds_per_unit: f64,
}

impl TimeAxis {
    /// Seconds since 1970-01-01, used when the variable carries no `units`.
    pub fn unix_seconds() -> Self {
        Self {
            // `NaiveDateTime::default()` is 1970-01-01T00:00:00.
            epoch: NaiveDateTime::default(),
            seconds_per_unit: 1.0,
        }
    }

    /// Parse a units string such as `seconds since 1970-01-01 00:00:00`.
    pub fn parse(units: &str) -> Result<Self, TimeUnitsError> {
        let (unit, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| TimeUnitsError::Malformed(units.to_string()))?;

        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86_400.0,
            other => return Err(TimeUnitsError::UnknownUnit(other.to_string())),
        };

        Ok(Self {
            epoch: parse_epoch(epoch)?,
            seconds_per_unit,
        })
    }

    /// Timestamp of a raw axis value, `None` for non-finite or out-of-range values.
    pub fn to_datetime(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.seconds_per_unit * 1000.0).round();
        if millis.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        let delta = TimeDelta::try_milliseconds(millis as i64)?;
        self.epoch.checked_add_signed(delta)
    }
}

fn parse_epoch(raw: &str) -> Result<NaiveDateTime, TimeUnitsError> {
    let trimmed = raw
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| TimeUnitsError::BadEpoch(raw.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Plot coordinates: x = UNIX seconds as f64
// ---------------------------------------------------------------------------

pub fn to_plot_x(t: &NaiveDateTime) -> f64 {
    t.and_utc().timestamp_millis() as f64 / 1000.0
}

pub fn from_plot_x(x: f64) -> Option<NaiveDateTime> {
    if !x.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((x * 1000.0).round() as i64).map(|d| d.naive_utc())
}

/// Midnight of `day` as a plot x coordinate.
pub fn day_start_x(day: NaiveDate) -> f64 {
    to_plot_x(&day.and_time(NaiveTime::MIN))
}
