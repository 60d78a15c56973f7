//! Simulated calendar.
//!
//! The engine reports seconds since the start of its run period; the
//! observation carries the calendar date instead.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use hvacgym_env::EnvError;
use serde::{Deserialize, Serialize};

/// Calendar fields of one simulated instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl SimDate {
    /// Date of `sim_time` seconds after midnight of `start`.
    pub fn from_sim_time(start: NaiveDate, sim_time: f64) -> Result<Self, EnvError> {
        if !sim_time.is_finite() || sim_time < 0.0 {
            return Err(EnvError::protocol(format!(
                "simulation time {} is not a non-negative number",
                sim_time
            )));
        }

        let midnight: NaiveDateTime = start.and_hms_opt(0, 0, 0).ok_or_else(|| {
            EnvError::configuration(format!("run period start {} has no midnight", start))
        })?;
        let overflow =
            || EnvError::protocol(format!("simulation time {} overflows the calendar", sim_time));
        let seconds = sim_time.round();
        if seconds >= i64::MAX as f64 {
            return Err(overflow());
        }
        let offset = Duration::try_seconds(seconds as i64).ok_or_else(overflow)?;
        let instant = midnight.checked_add_signed(offset).ok_or_else(overflow)?;

        Ok(Self {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
        })
    }

    /// Observation values for `year, month, day, hour`.
    pub fn as_values(&self) -> [f64; 4] {
        [
            f64::from(self.year),
            f64::from(self.month),
            f64::from(self.day),
            f64::from(self.hour),
        ]
    }
}

/// Whether the date falls on a Saturday or Sunday.
pub fn is_weekend(year: i32, month: u32, day: u32) -> Result<bool, EnvError> {
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        EnvError::protocol(format!("{}-{}-{} is not a calendar date", year, month, day))
    })?;
    Ok(matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
}

/// Whether `(month, day)` lies in the inclusive window `[from, to]`
/// (month, day) of the same year.
pub fn in_season(month: u32, day: u32, from: (u32, u32), to: (u32, u32)) -> bool {
    let key = (month, day);
    key >= from && key <= to
}
