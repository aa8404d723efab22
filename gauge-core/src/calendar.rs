//! Proleptic Gregorian calendar arithmetic
//!
//! Timestamps are plain `f64` seconds since 2001-01-01 00:00:00 UTC. Time
//! zones and leap seconds are not modelled.

use std::fmt;
use thiserror::Error;

/// Days from 0000-03-01 to 2001-01-01
const REFERENCE_EPOCH_DAYS: i64 = 730_791;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Decodable span either side of the epoch, about 2.1 billion years
const MAX_DAYS: f64 = 7.8e11;
const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DateTimeError {
    #[error("invalid month: {0} (must be 1-12)")]
    InvalidMonth(u32),
    #[error("invalid day: {0} for {1:04}-{2:02}")]
    InvalidDay(u32, i32, u32),
    #[error("invalid hour: {0} (must be 0-23)")]
    InvalidHour(u32),
    #[error("invalid minute: {0} (must be 0-59)")]
    InvalidMinute(u32),
    #[error("invalid second: {0} (must be in [0, 60))")]
    InvalidSecond(f64),
    #[error("time value is not finite")]
    NotFinite,
    #[error("time value {0} is outside the representable calendar range")]
    OutOfRange(f64),
}

/// Broken-down UTC time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CivilTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl CivilTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: f64) -> Self {
        Self { year, month, day, hour, minute, second }
    }

    /// Midnight of the given date
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self::new(year, month, day, 0, 0, 0.0)
    }

    pub fn validate(&self) -> Result<(), DateTimeError> {
        if !(1..=12).contains(&self.month) {
            return Err(DateTimeError::InvalidMonth(self.month));
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err(DateTimeError::InvalidDay(self.day, self.year, self.month));
        }
        if self.hour > 23 {
            return Err(DateTimeError::InvalidHour(self.hour));
        }
        if self.minute > 59 {
            return Err(DateTimeError::InvalidMinute(self.minute));
        }
        if !(0.0..60.0).contains(&self.second) {
            return Err(DateTimeError::InvalidSecond(self.second));
        }
        Ok(())
    }

    /// Seconds since 2001-01-01 00:00:00 UTC
    pub fn encode(&self) -> Result<f64, DateTimeError> {
        self.validate()?;
        let days = days_from_civil(self.year, self.month, self.day) - REFERENCE_EPOCH_DAYS;
        let clock = f64::from(self.hour * 3600 + self.minute * 60) + self.second;
        Ok(days as f64 * SECONDS_PER_DAY + clock)
    }
}

/// `YYYY-MM-DD hh:mm:ss`, fractional seconds only when present
impl fmt::Display for CivilTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:",
            self.year, self.month, self.day, self.hour, self.minute
        )?;
        let whole = self.second.trunc();
        let frac = self.second - whole;
        if frac.abs() < 1e-9 {
            write!(f, "{:02}", whole as u32)
        } else {
            let text = format!("{:09.6}", self.second);
            write!(f, "{}", text.trim_end_matches('0'))
        }
    }
}

/// Encode a broken-down UTC time
pub fn encode_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
) -> Result<f64, DateTimeError> {
    CivilTime::new(year, month, day, hour, minute, second).encode()
}

/// Decode seconds since 2001-01-01 00:00:00 UTC
pub fn decode_time(time: f64) -> Result<CivilTime, DateTimeError> {
    if !time.is_finite() {
        return Err(DateTimeError::NotFinite);
    }
    let days = (time / SECONDS_PER_DAY).floor();
    if days.abs() > MAX_DAYS {
        return Err(DateTimeError::OutOfRange(time));
    }
    let mut clock = time - days * SECONDS_PER_DAY;
    let mut days = days as i64;
    // rounding can push the remainder to a full day
    if clock >= SECONDS_PER_DAY {
        clock -= SECONDS_PER_DAY;
        days += 1;
    }
    let (year, month, day) =
        civil_from_days(days + REFERENCE_EPOCH_DAYS).ok_or(DateTimeError::OutOfRange(time))?;

    let hour = (clock / 3600.0).floor();
    clock -= hour * 3600.0;
    let minute = (clock / 60.0).floor();
    clock -= minute * 60.0;
    // snap values within a microsecond of a whole second
    let rounded = clock.round();
    let second = if (clock - rounded).abs() < 1e-6 { rounded } else { clock };

    let (mut hour, mut minute, mut second) = (hour as u32, minute as u32, second);
    if second >= 60.0 {
        second -= 60.0;
        minute += 1;
    }
    if minute >= 60 {
        minute -= 60;
        hour += 1;
    }
    if hour >= 24 {
        // only reachable through snapping at 23:59:59.9999995
        let (year, month, day) = civil_from_days(days + 1 + REFERENCE_EPOCH_DAYS)
            .ok_or(DateTimeError::OutOfRange(time))?;
        return Ok(CivilTime::date(year, month, day));
    }
    Ok(CivilTime::new(year, month, day, hour, minute, second))
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => u32::from(DAYS_IN_MONTH[(month - 1) as usize]),
        _ => 0,
    }
}

/// Days since 0000-03-01 (Howard Hinnant's algorithm)
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(if month <= 2 { year - 1 } else { year });
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe
}

/// `None` when the year does not fit an `i32`
fn civil_from_days(z: i64) -> Option<(i32, u32, u32)> {
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    Some((i32::try_from(year).ok()?, m as u32, d as u32))
}
