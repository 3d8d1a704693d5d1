//! Windowed linear interpolation of datalogger readings onto the time grid.

use std::collections::HashMap;
use std::ops::Range;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::frame::{grid_frame, read_timestamps, require_column, seconds_of_day, FieldValues};
use crate::interpolation::try_interpolate;
use crate::schema::SourceSchema;
use crate::time_grid::TimeGrid;

const TABLE: &str = "datalogger";

pub const DEFAULT_TOLERANCE_MINUTES: i64 = 10;

pub fn default_tolerance() -> Duration {
    Duration::minutes(DEFAULT_TOLERANCE_MINUTES)
}

/// Raw rows of one source, ordered by timestamp and split into per-date ranges.
struct DayIndex {
    rows: Vec<usize>,
    seconds: Vec<i64>,
    days: HashMap<NaiveDate, Range<usize>>,
}

impl DayIndex {
    fn new(timestamps: &[Option<NaiveDateTime>]) -> Self {
        let mut ordered: Vec<(NaiveDateTime, usize)> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(idx, ts)| ts.map(|ts| (ts, idx)))
            .collect();
        ordered.sort_by_key(|(ts, _)| *ts);

        let mut days: HashMap<NaiveDate, Range<usize>> = HashMap::new();
        for (pos, (ts, _)) in ordered.iter().enumerate() {
            days.entry(ts.date())
                .and_modify(|range| range.end = pos + 1)
                .or_insert(pos..pos + 1);
        }

        Self {
            rows: ordered.iter().map(|(_, idx)| *idx).collect(),
            seconds: ordered.iter().map(|(ts, _)| seconds_of_day(ts.time())).collect(),
            days,
        }
    }
}

/// For each grid instant, fits the raw readings of the same date lying within `tolerance`
/// and evaluates the fit at the grid time-of-day.
///
/// A reading taken exactly at the grid instant is copied unchanged. Otherwise at least two
/// readings with distinct times are required; with fewer the cell stays null, so values are
/// never extrapolated from a single sample or across dates.
#[instrument(skip_all, fields(rows = raw.height(), grid = grid.len(), tolerance_s = tolerance.num_seconds()))]
pub fn harmonize_datalogger(
    raw: &DataFrame,
    grid: &TimeGrid,
    schema: &SourceSchema,
    tolerance: Duration,
) -> Result<DataFrame> {
    let len = grid.len();

    if raw.height() == 0 {
        warn!("datalogger table is empty; harmonized climate columns are null");
        let fields = schema
            .enabled_fields()
            .map(|field| (field.canonical.clone(), FieldValues::nulls(field.kind, len)))
            .collect();
        return Ok(grid_frame(grid.timestamps(), fields)?);
    }

    let mut mapped = Vec::new();
    for field in schema.resolve(raw, TABLE) {
        if !field.kind.is_numeric() {
            warn!(canonical = %field.canonical, kind = ?field.kind, "cannot interpolate non-numeric datalogger field");
            continue;
        }
        let column = require_column(raw, TABLE, &field.source)?;
        mapped.push((field, FieldValues::extract(column, field.kind)?));
    }

    let index = DayIndex::new(&read_timestamps(raw, TABLE, &schema.timestamp)?);
    let tolerance_secs = tolerance.num_seconds().abs();

    let mut outputs: Vec<FieldValues> = mapped
        .iter()
        .map(|(field, _)| FieldValues::nulls(field.kind, len))
        .collect();

    let mut current_date: Option<NaiveDate> = None;
    let mut lower = 0usize;
    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();

    for (pos, ts) in grid.timestamps().iter().enumerate() {
        let date = ts.date();
        let Some(day) = index.days.get(&date) else {
            continue;
        };
        if current_date != Some(date) {
            current_date = Some(date);
            lower = day.start;
        }

        let target = seconds_of_day(ts.time());
        while lower < day.end && index.seconds[lower] < target - tolerance_secs {
            lower += 1;
        }
        let mut upper = lower;
        while upper < day.end && index.seconds[upper] <= target + tolerance_secs {
            upper += 1;
        }
        if lower == upper {
            continue;
        }

        for ((_, values), output) in mapped.iter().zip(outputs.iter_mut()) {
            xs.clear();
            ys.clear();
            let mut exact = None;
            for sorted in lower..upper {
                let Some(value) = values.number(index.rows[sorted]) else {
                    continue;
                };
                if index.seconds[sorted] == target {
                    exact = Some(value);
                    break;
                }
                xs.push(index.seconds[sorted] as f64 / 60.0);
                ys.push(value);
            }

            let estimate = exact.or_else(|| try_interpolate(&xs, &ys, target as f64 / 60.0));
            if let Some(value) = estimate {
                output.set_number(pos, value);
            }
        }
    }

    let fields: Vec<(String, FieldValues)> = mapped
        .iter()
        .map(|(field, _)| field.canonical.clone())
        .zip(outputs)
        .collect();
    for (name, values) in &fields {
        debug!(column = %name, filled = values.filled(), "interpolated datalogger column");
    }
    info!(dates = index.days.len(), "harmonized datalogger table");

    Ok(grid_frame(grid.timestamps(), fields)?)
}
