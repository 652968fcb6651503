// src/excel_date.rs

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde_json::Value;
use std::fmt::Display;

/// Serial of 1970-01-01 in the 1900 date system.
const UNIX_EPOCH_SERIAL: f64 = 25569.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// Reads a cell as a date serial. Numbers and numeric strings are accepted;
/// zero, NaN and anything else yield `None`.
pub fn serial_from_cell(cell: &Value) -> Option<f64> {
    let serial = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if serial == 0.0 || !serial.is_finite() {
        return None;
    }
    Some(serial)
}

/// Resolves a serial in `tz`.
///
/// The whole-day part is taken as a UTC midnight and moved to its calendar
/// date in `tz`; the fractional part is then applied as wall-clock time in
/// `tz`. West of UTC this lands on the previous calendar day.
pub fn serial_to_datetime<Tz: TimeZone>(serial: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    let utc_days = (serial - UNIX_EPOCH_SERIAL).floor();
    let utc_seconds = (utc_days * SECONDS_PER_DAY) as i64;
    let midnight = Utc.timestamp_opt(utc_seconds, 0).single()?;
    let date = midnight.with_timezone(tz).date_naive();

    let fractional_day = serial - serial.floor();
    let total_seconds = (SECONDS_PER_DAY * fractional_day).floor() as u32;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    let naive = date.and_hms_opt(hours, minutes, seconds)?;
    tz.from_local_datetime(&naive)
        .earliest()
        // skipped by a DST jump; clocks read an hour later
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// en-US style date-time, e.g. `1/1/2023, 12:00:00 PM`.
pub fn format_locale<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    datetime.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

pub fn decode_cell_in<Tz: TimeZone>(cell: &Value, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    serial_from_cell(cell)
        .and_then(|serial| serial_to_datetime(serial, tz))
        .map(|datetime| format_locale(&datetime))
        .unwrap_or_default()
}

/// Decodes a serial cell to a local date-time string, or `""` when it is not a usable serial.
pub fn decode_cell(cell: &Value) -> String {
    decode_cell_in(cell, &Local)
}
