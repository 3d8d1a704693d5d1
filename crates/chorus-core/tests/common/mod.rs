#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

pub fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").expect("timestamp literal")
}

pub fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date literal")
}

/// A `Datetime(µs)` column built from `YYYY-MM-DD HH:MM` literals.
pub fn datetime_column(name: &str, values: &[&str]) -> Column {
    let micros: Vec<i64> = values
        .iter()
        .map(|value| at(value).and_utc().timestamp_micros())
        .collect();
    Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .expect("datetime cast")
        .into()
}

/// A `Date` column built from `YYYY-MM-DD` literals.
pub fn date_column(name: &str, values: &[&str]) -> Column {
    let days: Vec<i32> = values
        .iter()
        .map(|value| (day(value) - NaiveDate::default()).num_days() as i32)
        .collect();
    Series::new(name.into(), days)
        .cast(&DataType::Date)
        .expect("date cast")
        .into()
}

/// `timestamp` column followed by `columns`.
pub fn timestamped(values: &[&str], columns: Vec<Column>) -> DataFrame {
    let mut all = vec![datetime_column("timestamp", values)];
    all.extend(columns);
    DataFrame::new(all).expect("frame")
}

/// A grid-aligned table: `timestamp`, `date` and `time` followed by `columns`.
pub fn grid_table(values: &[&str], columns: Vec<Column>) -> DataFrame {
    let instants: Vec<NaiveDateTime> = values.iter().map(|value| at(value)).collect();
    let days: Vec<i32> = instants
        .iter()
        .map(|ts| (ts.date() - NaiveDate::default()).num_days() as i32)
        .collect();
    let nanos: Vec<i64> = instants
        .iter()
        .map(|ts| i64::from(ts.time().num_seconds_from_midnight()) * 1_000_000_000)
        .collect();

    let mut all = vec![
        datetime_column("timestamp", values),
        Series::new("date".into(), days)
            .cast(&DataType::Date)
            .expect("date cast")
            .into(),
        Series::new("time".into(), nanos)
            .cast(&DataType::Time)
            .expect("time cast")
            .into(),
    ];
    all.extend(columns);
    DataFrame::new(all).expect("frame")
}

pub fn floats(frame: &DataFrame, name: &str) -> Vec<Option<f64>> {
    frame
        .column(name)
        .expect("column")
        .cast(&DataType::Float64)
        .expect("float cast")
        .f64()
        .expect("f64")
        .into_iter()
        .collect()
}

pub fn timestamps(frame: &DataFrame, name: &str) -> Vec<NaiveDateTime> {
    frame
        .column(name)
        .expect("column")
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .and_then(|c| c.cast(&DataType::Int64))
        .expect("micros cast")
        .i64()
        .expect("i64")
        .into_iter()
        .flatten()
        .filter_map(|micros| DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc()))
        .collect()
}

/// Value at the grid row whose timestamp equals `when`.
pub fn value_at(frame: &DataFrame, name: &str, when: &str) -> Option<f64> {
    let target = at(when);
    let row = timestamps(frame, "timestamp")
        .iter()
        .position(|ts| *ts == target)
        .expect("grid row");
    floats(frame, name)[row]
}
