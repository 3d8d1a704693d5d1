//! Exact-match alignment of weather-station records after UTC to local correction.
//!
//! Stations publish hourly records stamped in UTC, either as a single timestamp column or as
//! a calendar date plus an `HHMM` hour code. Both shapes are combined into one instant before
//! the offset is applied, so a correction that crosses midnight moves the calendar date with
//! it (01:00 UTC on the 2nd is 22:00 local on the 1st at UTC-3).

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, NaiveTime, TimeZone as _};
use chrono_tz::Tz;
use polars::prelude::DataFrame;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::frame::{grid_frame, read_integers, read_timestamps, require_column, FieldValues};
use crate::schema::SourceSchema;
use crate::time_grid::TimeGrid;

const TABLE: &str = "weather_station";

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtcOffset {
    FixedHours(i32),
    Zone(Tz),
}

impl Default for UtcOffset {
    fn default() -> Self {
        UtcOffset::FixedHours(DEFAULT_UTC_OFFSET_HOURS)
    }
}

impl UtcOffset {
    pub fn to_local(&self, utc: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            UtcOffset::FixedHours(hours) => {
                utc.checked_add_signed(Duration::hours(i64::from(*hours)))
            }
            UtcOffset::Zone(tz) => Some(tz.from_utc_datetime(&utc).naive_local()),
        }
    }
}

/// How the UTC instant of a raw record is stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WeatherTimestamps {
    /// The schema's timestamp column holds the full UTC instant.
    #[default]
    Timestamp,
    /// The schema's timestamp column holds the date; `hour_code` holds `HHMM` (e.g. 2300).
    DateHourCode { hour_code: String },
}

/// Decodes an `HHMM` hour code. Returns `None` outside `00:00..=23:59`.
pub fn hour_code_time(code: i64) -> Option<NaiveTime> {
    if !(0..=2359).contains(&code) {
        return None;
    }
    NaiveTime::from_hms_opt((code / 100) as u32, (code % 100) as u32, 0)
}

/// Local instants of every raw record, index-aligned with `raw`. Records whose instant is
/// null or undecodable are `None`.
pub fn local_timestamps(
    raw: &DataFrame,
    schema: &SourceSchema,
    shape: &WeatherTimestamps,
    offset: UtcOffset,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let instants = read_timestamps(raw, TABLE, &schema.timestamp)?;

    let utc: Vec<Option<NaiveDateTime>> = match shape {
        WeatherTimestamps::Timestamp => instants,
        WeatherTimestamps::DateHourCode { hour_code } => {
            let codes = read_integers(raw, TABLE, hour_code)?;
            let mut invalid = 0usize;
            let combined = instants
                .iter()
                .zip(codes)
                .map(|(date, code)| {
                    let time = code.and_then(hour_code_time);
                    if date.is_some() && time.is_none() {
                        invalid += 1;
                    }
                    Some(date.as_ref()?.date().and_time(time?))
                })
                .collect();
            if invalid > 0 {
                warn!(invalid, column = %hour_code, "weather-station rows with invalid hour code ignored");
            }
            combined
        }
    };

    Ok(utc
        .into_iter()
        .map(|ts| ts.and_then(|ts| offset.to_local(ts)))
        .collect())
}

/// Copies every mapped field of the record whose local date and time equal each grid
/// instant. Grid rows without such a record stay null; the first record wins on duplicates.
#[instrument(skip_all, fields(rows = raw.height(), grid = grid.len(), ?offset))]
pub fn harmonize_weather_station(
    raw: &DataFrame,
    grid: &TimeGrid,
    schema: &SourceSchema,
    shape: &WeatherTimestamps,
    offset: UtcOffset,
) -> Result<DataFrame> {
    let len = grid.len();

    if raw.height() == 0 {
        warn!("weather-station table is empty; harmonized climate columns are null");
        let fields = schema
            .enabled_fields()
            .map(|field| (field.canonical.clone(), FieldValues::nulls(field.kind, len)))
            .collect();
        return Ok(grid_frame(grid.timestamps(), fields)?);
    }

    let local = local_timestamps(raw, schema, shape, offset)?;
    let mut by_instant: HashMap<NaiveDateTime, usize> = HashMap::with_capacity(local.len());
    for (idx, ts) in local.iter().enumerate() {
        if let Some(ts) = ts {
            by_instant.entry(*ts).or_insert(idx);
        }
    }

    let matches: Vec<(usize, usize)> = grid
        .timestamps()
        .iter()
        .enumerate()
        .filter_map(|(pos, ts)| by_instant.get(ts).map(|&row| (pos, row)))
        .collect();

    let mapped = schema.resolve(raw, TABLE);
    let mut fields = Vec::with_capacity(mapped.len());
    for field in mapped {
        let column = require_column(raw, TABLE, &field.source)?;
        let source = FieldValues::extract(column, field.kind)?;
        let mut output = FieldValues::nulls(field.kind, len);
        for &(pos, row) in &matches {
            output.copy_from(pos, &source, row);
        }
        fields.push((field.canonical.clone(), output));
    }

    info!(matched = matches.len(), "harmonized weather-station table");

    Ok(grid_frame(grid.timestamps(), fields)?)
}
