use hifitime::Epoch;
use std::sync::LazyLock;

use regex::Regex;

use crate::{
    constants::{JulianDay, SECONDS_PER_DAY},
    porkchop_errors::PorkchopError,
};

static CALENDAR_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})-(\d{1,2})-(\d{1,2})\s*$").expect("valid regex"));

/// Transformation from a calendar day in the format YYYY-MM-DD (UTC) to an epoch
///
/// Argument
/// --------
/// * `date`: a string in the format YYYY-MM-DD, as sent by the request form
///
/// Return
/// ------
/// * the epoch at midnight UTC of that day, or [`PorkchopError::InvalidRequest`]
pub fn calendar_day_to_epoch(date: &str) -> Result<Epoch, PorkchopError> {
    let caps = CALENDAR_DAY
        .captures(date)
        .ok_or_else(|| PorkchopError::InvalidRequest(format!("invalid date: {date:?}")))?;

    let parse_err = |_| PorkchopError::InvalidRequest(format!("invalid date: {date:?}"));
    let year: i32 = caps[1].parse().map_err(parse_err)?;
    let month: u8 = caps[2].parse().map_err(parse_err)?;
    let day: u8 = caps[3].parse().map_err(parse_err)?;

    Epoch::maybe_from_gregorian_utc(year, month, day, 0, 0, 0, 0)
        .map_err(|e| PorkchopError::InvalidRequest(format!("invalid date {date:?}: {e}")))
}

/// Number of days from `start` to `end` (negative if `end` is earlier)
pub fn days_between(start: &Epoch, end: &Epoch) -> f64 {
    (*end - *start).to_seconds() / SECONDS_PER_DAY
}

/// Format a julian date as a YYYY-MM-DD calendar label (UTC)
///
/// Argument
/// --------
/// * `jd`: a julian date
///
/// Return
/// ------
/// * the calendar day, or `None` if `jd` is not finite
pub fn jd_to_date_label(jd: JulianDay) -> Option<String> {
    if !jd.is_finite() {
        return None;
    }
    let (year, month, day, ..) = Epoch::from_jde_utc(jd).to_gregorian_utc();
    Some(format!("{year:04}-{month:02}-{day:02}"))
}
