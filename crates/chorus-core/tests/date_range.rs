mod common;

use chorus_core::date_range::{select_date_range, DateRange};
use chorus_core::HarmonizeError;
use polars::prelude::*;

use common::{date_column, day, floats, timestamped};

fn readings() -> DataFrame {
    timestamped(
        &["2022-03-01 10:00", "2022-03-02 10:00", "2022-03-03 10:00", "2022-03-04 10:00"],
        vec![Series::new("value".into(), &[1.0f64, 2.0, 3.0, 4.0]).into()],
    )
}

#[test]
fn bounds_parse_and_validate() {
    let range = DateRange::parse("2022-03-01", " 2022-03-31 ").unwrap();
    assert_eq!(range.start, day("2022-03-01"));
    assert!(range.contains(day("2022-03-31")));
    assert!(!range.contains(day("2022-04-01")));

    assert!(matches!(
        DateRange::parse("2022-13-01", "2022-03-31"),
        Err(HarmonizeError::InvalidDate { bound: "start", .. })
    ));
    assert!(matches!(
        DateRange::parse("2022-03-01", "31/03/2022"),
        Err(HarmonizeError::InvalidDate { bound: "end", .. })
    ));
    assert!(matches!(
        DateRange::parse("2022-03-31", "2022-03-01"),
        Err(HarmonizeError::InvertedRange { .. })
    ));
}

#[test]
fn selection_is_inclusive() {
    let range = DateRange::parse("2022-03-02", "2022-03-03").unwrap();
    let selection = select_date_range(&readings(), "datalogger", "timestamp", range).unwrap();

    assert_eq!(floats(&selection.frame, "value"), vec![Some(2.0), Some(3.0)]);
    assert!(!selection.is_clamped());
}

#[test]
fn range_wider_than_the_data_is_clamped() {
    let range = DateRange::parse("2022-02-20", "2022-03-02").unwrap();
    let selection = select_date_range(&readings(), "datalogger", "timestamp", range).unwrap();

    assert_eq!(selection.frame.height(), 2);
    assert!(selection.is_clamped());
    assert_eq!(
        selection.effective,
        Some(DateRange::new(day("2022-03-01"), day("2022-03-02")).unwrap())
    );
}

#[test]
fn disjoint_range_selects_nothing() {
    let range = DateRange::parse("2023-01-01", "2023-01-31").unwrap();
    let selection = select_date_range(&readings(), "datalogger", "timestamp", range).unwrap();

    assert_eq!(selection.frame.height(), 0);
    assert_eq!(selection.effective, None);
}

#[test]
fn date_columns_are_selectable() {
    let frame = DataFrame::new(vec![
        date_column("day", &["2022-03-01", "2022-03-05"]),
        Series::new("value".into(), &[1.0f64, 5.0]).into(),
    ])
    .unwrap();
    let range = DateRange::parse("2022-03-05", "2022-03-05").unwrap();
    let selection = select_date_range(&frame, "weather_station", "day", range).unwrap();

    assert_eq!(floats(&selection.frame, "value"), vec![Some(5.0)]);
}

#[test]
fn empty_table_is_not_an_error() {
    let empty = timestamped(&[], vec![Series::new("value".into(), Vec::<f64>::new()).into()]);
    let range = DateRange::parse("2022-03-01", "2022-03-02").unwrap();
    let selection = select_date_range(&empty, "inference", "timestamp", range).unwrap();

    assert_eq!(selection.frame.height(), 0);
    assert!(selection.effective.is_none());
}
