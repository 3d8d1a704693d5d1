use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use polars::prelude::*;

use crate::error::{HarmonizeError, Result};
use crate::schema::FieldKind;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const DATE_COLUMN: &str = "date";
pub const TIME_COLUMN: &str = "time";

/// Leading columns of every grid-aligned table, in order.
pub const GRID_COLUMNS: [&str; 3] = [TIMESTAMP_COLUMN, DATE_COLUMN, TIME_COLUMN];

const NANOS_PER_SECOND: i64 = 1_000_000_000;

pub(crate) fn naive_from_micros(value: i64) -> Option<NaiveDateTime> {
    let secs = value.div_euclid(1_000_000);
    let micros = value.rem_euclid(1_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, micros * 1_000).map(|dt| dt.naive_utc())
}

pub(crate) fn naive_to_micros(value: NaiveDateTime) -> i64 {
    let dt_utc = value.and_utc();
    dt_utc.timestamp() * 1_000_000 + i64::from(dt_utc.timestamp_subsec_nanos() / 1_000)
}

pub(crate) fn seconds_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    // NaiveDate::default() is 1970-01-01.
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn nanos_of_day(time: NaiveTime) -> i64 {
    seconds_of_day(time) * NANOS_PER_SECOND + i64::from(time.nanosecond() % 1_000_000_000)
}

pub(crate) fn require_column<'a>(
    frame: &'a DataFrame,
    table: &'static str,
    name: &str,
) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| HarmonizeError::MissingColumn {
            table,
            column: name.to_string(),
        })
}

/// Reads a Date or Datetime column (any unit) as naive timestamps. Dates become midnight.
pub(crate) fn read_timestamps(
    frame: &DataFrame,
    table: &'static str,
    name: &str,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let column = require_column(frame, table, name)?;
    let micros = column
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(micros
        .i64()?
        .into_iter()
        .map(|value| value.and_then(naive_from_micros))
        .collect())
}

pub(crate) fn read_integers(
    frame: &DataFrame,
    table: &'static str,
    name: &str,
) -> Result<Vec<Option<i64>>> {
    let column = require_column(frame, table, name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

/// Float values of `name`, or an all-null vector when the column is absent.
pub(crate) fn read_floats_or_nulls(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if frame.get_column_index(name).is_none() {
        return Ok(vec![None; frame.height()]);
    }
    let column = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Builds the `timestamp`, `date` and `time` columns for the given instants.
pub(crate) fn grid_columns(timestamps: &[NaiveDateTime]) -> PolarsResult<Vec<Column>> {
    let len = timestamps.len();
    let mut micros = Vec::with_capacity(len);
    let mut days = Vec::with_capacity(len);
    let mut nanos = Vec::with_capacity(len);

    for ts in timestamps {
        micros.push(naive_to_micros(*ts));
        days.push(days_since_epoch(ts.date()));
        nanos.push(nanos_of_day(ts.time()));
    }

    Ok(vec![
        Series::new(TIMESTAMP_COLUMN.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
            .into(),
        Series::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)?
            .into(),
        Series::new(TIME_COLUMN.into(), nanos)
            .cast(&DataType::Time)?
            .into(),
    ])
}

/// A typed, nullable column buffer, used both for raw source values and for pre-sized
/// grid-indexed output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValues {
    Float(Vec<Option<f64>>),
    Integer(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
}

impl FieldValues {
    pub fn nulls(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::Float => FieldValues::Float(vec![None; len]),
            FieldKind::Integer => FieldValues::Integer(vec![None; len]),
            FieldKind::Text => FieldValues::Text(vec![None; len]),
            FieldKind::Boolean => FieldValues::Boolean(vec![None; len]),
        }
    }

    /// Coerces `column` to `kind`. Unparseable values become null.
    pub fn extract(column: &Column, kind: FieldKind) -> Result<Self> {
        let casted = column.cast(&kind.data_type())?;
        let values = match kind {
            FieldKind::Float => FieldValues::Float(casted.f64()?.into_iter().collect()),
            FieldKind::Integer => FieldValues::Integer(casted.i64()?.into_iter().collect()),
            FieldKind::Text => FieldValues::Text(
                casted
                    .str()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect(),
            ),
            FieldKind::Boolean => FieldValues::Boolean(casted.bool()?.into_iter().collect()),
        };
        Ok(values)
    }

    pub fn number(&self, idx: usize) -> Option<f64> {
        match self {
            FieldValues::Float(values) => values[idx].filter(|value| value.is_finite()),
            FieldValues::Integer(values) => values[idx].map(|value| value as f64),
            FieldValues::Text(_) | FieldValues::Boolean(_) => None,
        }
    }

    pub fn set_number(&mut self, idx: usize, value: f64) {
        match self {
            FieldValues::Float(values) => values[idx] = Some(value),
            FieldValues::Integer(values) => values[idx] = Some(value.round() as i64),
            FieldValues::Text(_) | FieldValues::Boolean(_) => {}
        }
    }

    pub fn copy_from(&mut self, dst: usize, src: &FieldValues, src_idx: usize) {
        match (self, src) {
            (FieldValues::Float(d), FieldValues::Float(s)) => d[dst] = s[src_idx],
            (FieldValues::Integer(d), FieldValues::Integer(s)) => d[dst] = s[src_idx],
            (FieldValues::Text(d), FieldValues::Text(s)) => d[dst].clone_from(&s[src_idx]),
            (FieldValues::Boolean(d), FieldValues::Boolean(s)) => d[dst] = s[src_idx],
            _ => debug_assert!(false, "field kinds diverged"),
        }
    }

    /// Writes the maximum of `rows` into `dst`. Text keeps the first non-null value in row
    /// order and Boolean is a logical OR.
    pub fn max_into(&mut self, dst: usize, src: &FieldValues, rows: &[usize]) {
        match (self, src) {
            (FieldValues::Float(d), FieldValues::Float(s)) => {
                d[dst] = rows
                    .iter()
                    .filter_map(|&idx| s[idx].filter(|value| !value.is_nan()))
                    .reduce(f64::max);
            }
            (FieldValues::Integer(d), FieldValues::Integer(s)) => {
                d[dst] = rows.iter().filter_map(|&idx| s[idx]).max();
            }
            (FieldValues::Text(d), FieldValues::Text(s)) => {
                d[dst] = rows.iter().find_map(|&idx| s[idx].clone());
            }
            (FieldValues::Boolean(d), FieldValues::Boolean(s)) => {
                d[dst] = rows.iter().filter_map(|&idx| s[idx]).reduce(|a, b| a || b);
            }
            _ => debug_assert!(false, "field kinds diverged"),
        }
    }

    pub fn filled(&self) -> usize {
        match self {
            FieldValues::Float(values) => values.iter().filter(|v| v.is_some()).count(),
            FieldValues::Integer(values) => values.iter().filter(|v| v.is_some()).count(),
            FieldValues::Text(values) => values.iter().filter(|v| v.is_some()).count(),
            FieldValues::Boolean(values) => values.iter().filter(|v| v.is_some()).count(),
        }
    }

    pub fn into_column(self, name: &str) -> Column {
        match self {
            FieldValues::Float(values) => Series::new(name.into(), values).into(),
            FieldValues::Integer(values) => Series::new(name.into(), values).into(),
            FieldValues::Text(values) => Series::new(name.into(), values).into(),
            FieldValues::Boolean(values) => Series::new(name.into(), values).into(),
        }
    }
}

/// Assembles a grid-aligned table: the grid columns followed by one column per field.
pub(crate) fn grid_frame(
    timestamps: &[NaiveDateTime],
    fields: Vec<(String, FieldValues)>,
) -> PolarsResult<DataFrame> {
    let mut columns = grid_columns(timestamps)?;
    columns.reserve(fields.len());
    for (name, values) in fields {
        columns.push(values.into_column(&name));
    }
    DataFrame::new(columns)
}
