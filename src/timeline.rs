//! Week track geometry and the clock that places "now" on it.
//!
//! The track covers seven days of 24 hours at one unit per hour, centred on
//! zero, so positions fall in `[-84, 84)`. Out-of-range inputs extrapolate.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};

pub const HOURS_PER_DAY: f64 = 24.0;
pub const DAYS_PER_WEEK: f64 = 7.0;
pub const UNIT: f64 = 1.0;
pub const TRACK_LENGTH: f64 = DAYS_PER_WEEK * HOURS_PER_DAY * UNIT;

pub fn day_start(day_index: i32) -> f64 {
    -TRACK_LENGTH / 2.0 + day_index as f64 * HOURS_PER_DAY * UNIT
}

pub fn position(day_index: i32, hour: f64) -> f64 {
    day_start(day_index) + hour * UNIT
}

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant; advanced explicitly.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl FixedClock {
    pub fn advance(&mut self, by: chrono::Duration) {
        self.0 += by;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Day and fractional hour of an instant seen from the tracker's fixed offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekTime {
    pub day_index: u8,
    pub hour: f64,
}

impl WeekTime {
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = instant.with_timezone(&offset);
        let hour = local.hour() as f64
            + local.minute() as f64 / 60.0
            + local.second() as f64 / 3600.0;
        WeekTime {
            day_index: local.weekday().num_days_from_monday() as u8,
            hour,
        }
    }

    pub fn position(&self) -> f64 {
        position(self.day_index as i32, self.hour)
    }
}

/// The fixed zone every "now" is read in. Offsets chrono cannot represent
/// collapse to UTC.
pub fn tracker_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

pub fn now_position(clock: &dyn Clock, offset: FixedOffset) -> f64 {
    WeekTime::at(clock.now(), offset).position()
}
