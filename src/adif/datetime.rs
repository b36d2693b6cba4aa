//! Timestamp derivation
//!
//! Builds the combined start/end timestamps of a record from its ADIF
//! `qso_date` (YYYYMMDD) and `time_on`/`time_off` (HHMM or HHMMSS) fields.
//! Seconds are ignored.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::error::DerivationError;

fn digits(field: &'static str, value: &str, lens: &[usize]) -> Result<(), DerivationError> {
    if !lens.contains(&value.len()) {
        return Err(DerivationError {
            field,
            value: value.to_string(),
            reason: "wrong length",
        });
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DerivationError {
            field,
            value: value.to_string(),
            reason: "not numeric",
        });
    }
    Ok(())
}

fn number(value: &str) -> u32 {
    // Only called on ASCII digit slices of at most four characters
    value.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Parse an ADIF date (YYYYMMDD)
pub fn parse_qso_date(date: &str) -> Result<NaiveDate, DerivationError> {
    digits("qso_date", date, &[8])?;
    let year = number(&date[..4]) as i32;
    let month = number(&date[4..6]);
    let day = number(&date[6..8]);
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DerivationError {
        field: "qso_date",
        value: date.to_string(),
        reason: "no such calendar date",
    })
}

/// Parse an ADIF time (HHMM or HHMMSS) to hours and minutes
pub fn parse_qso_time(field: &'static str, time: &str) -> Result<NaiveTime, DerivationError> {
    digits(field, time, &[4, 6])?;
    let hours = number(&time[..2]);
    let minutes = number(&time[2..4]);
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(|| DerivationError {
        field,
        value: time.to_string(),
        reason: "hour or minute out of range",
    })
}

/// Combine a record's date with one of its time fields
pub fn combine(
    date: &str,
    time_field: &'static str,
    time: &str,
) -> Result<NaiveDateTime, DerivationError> {
    let date = parse_qso_date(date)?;
    let time = parse_qso_time(time_field, time)?;
    Ok(date.and_time(time))
}
