mod common;

use chorus_core::datalogger::{default_tolerance, harmonize_datalogger};
use chorus_core::schema::{datalogger_schema, DEW_POINT, RELATIVE_HUMIDITY, TEMPERATURE};
use chorus_core::{FieldKind, FieldMapping, GridStep, TimeGrid};
use chrono::Duration;
use polars::prelude::*;

use common::{at, day, floats, timestamped, value_at};

fn ten_minute_grid() -> TimeGrid {
    TimeGrid::from_span(
        at("2022-03-01 08:00"),
        day("2022-03-01"),
        GridStep::minutes(10).unwrap(),
    )
}

#[test]
fn gap_between_two_readings_is_interpolated() {
    let raw = timestamped(
        &["2022-03-01 08:00", "2022-03-01 08:20"],
        vec![Series::new("T(C)_DL".into(), &[20.0f64, 22.0]).into()],
    );
    let out = harmonize_datalogger(
        &raw,
        &ten_minute_grid(),
        &datalogger_schema(),
        default_tolerance(),
    )
    .unwrap();

    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 08:00"), Some(20.0));
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 08:10"), Some(21.0));
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 08:20"), Some(22.0));
    // a single neighbour is not enough to fit a line
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 08:30"), None);
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 12:00"), None);
}

#[test]
fn grid_aligned_readings_round_trip_exactly() {
    let times: Vec<String> = (0..96)
        .map(|slot| {
            format!(
                "2022-03-01 {:02}:{:02}",
                slot * 15 / 60,
                slot * 15 % 60
            )
        })
        .collect();
    let time_refs: Vec<&str> = times.iter().map(String::as_str).collect();
    let temperature: Vec<f64> = (0..96).map(|i| 18.0 + ((i * 37) % 11) as f64 * 0.37).collect();
    let humidity: Vec<f64> = (0..96).map(|i| 60.0 + ((i * 13) % 7) as f64 * 1.13).collect();

    let raw = timestamped(
        &time_refs,
        vec![
            Series::new("T(C)_DL".into(), temperature.clone()).into(),
            Series::new("RH(%)_DL".into(), humidity.clone()).into(),
        ],
    );
    let grid = TimeGrid::from_frame(&raw, "timestamp", GridStep::default()).unwrap();
    let out = harmonize_datalogger(&raw, &grid, &datalogger_schema(), default_tolerance()).unwrap();

    let expected_t: Vec<Option<f64>> = temperature.into_iter().map(Some).collect();
    let expected_rh: Vec<Option<f64>> = humidity.into_iter().map(Some).collect();
    assert_eq!(floats(&out, TEMPERATURE), expected_t);
    assert_eq!(floats(&out, RELATIVE_HUMIDITY), expected_rh);
    // dew point was mapped but absent from the source
    assert!(out.column(DEW_POINT).is_err());
}

#[test]
fn neighbourhoods_never_cross_midnight() {
    let raw = timestamped(
        &["2022-03-01 23:50", "2022-03-02 00:10", "2022-03-02 00:20"],
        vec![Series::new("T(C)_DL".into(), &[15.0f64, 14.0, 13.0]).into()],
    );
    let grid = TimeGrid::from_span(
        at("2022-03-01 23:50"),
        day("2022-03-02"),
        GridStep::minutes(10).unwrap(),
    );
    let out = harmonize_datalogger(&raw, &grid, &datalogger_schema(), default_tolerance()).unwrap();

    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-02 00:00"), None);
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-02 00:10"), Some(14.0));
    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-02 00:30"), None);
}

#[test]
fn wider_tolerance_fits_more_readings() {
    let raw = timestamped(
        &["2022-03-01 08:00", "2022-03-01 08:20", "2022-03-01 08:40"],
        vec![Series::new("T(C)_DL".into(), &[20.0f64, 22.0, 23.0]).into()],
    );
    let narrow =
        harmonize_datalogger(&raw, &ten_minute_grid(), &datalogger_schema(), default_tolerance())
            .unwrap();
    let wide = harmonize_datalogger(
        &raw,
        &ten_minute_grid(),
        &datalogger_schema(),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(value_at(&narrow, TEMPERATURE, "2022-03-01 08:10"), Some(21.0));
    // least squares over all three readings
    assert_eq!(value_at(&wide, TEMPERATURE, "2022-03-01 08:10"), Some(20.9));
}

#[test]
fn null_readings_are_ignored() {
    let raw = timestamped(
        &["2022-03-01 08:00", "2022-03-01 08:10", "2022-03-01 08:20"],
        vec![Series::new("T(C)_DL".into(), &[Some(20.0f64), None, Some(22.0)]).into()],
    );
    let out = harmonize_datalogger(
        &raw,
        &ten_minute_grid(),
        &datalogger_schema(),
        default_tolerance(),
    )
    .unwrap();

    assert_eq!(value_at(&out, TEMPERATURE, "2022-03-01 08:10"), Some(21.0));
}

#[test]
fn integer_fields_are_rounded_and_text_fields_skipped() -> PolarsResult<()> {
    let raw = timestamped(
        &["2022-03-01 08:00", "2022-03-01 08:20"],
        vec![
            Series::new("battery".into(), &[11i64, 14]).into(),
            Series::new("status".into(), &["ok", "ok"]).into(),
        ],
    );
    let schema = datalogger_schema()
        .with_field(FieldMapping::new("battery_v", "battery", FieldKind::Integer))
        .with_field(FieldMapping::new("status", "status", FieldKind::Text));
    let out = harmonize_datalogger(&raw, &ten_minute_grid(), &schema, default_tolerance()).unwrap();

    let battery: Vec<Option<i64>> = out.column("battery_v")?.i64()?.into_iter().collect();
    assert_eq!(battery[1], Some(13));
    assert!(out.column("status").is_err());
    Ok(())
}

#[test]
fn empty_datalogger_yields_null_climate() {
    let raw = timestamped(&[], vec![Series::new("T(C)_DL".into(), Vec::<f64>::new()).into()]);
    let out = harmonize_datalogger(
        &raw,
        &ten_minute_grid(),
        &datalogger_schema(),
        default_tolerance(),
    )
    .unwrap();

    assert_eq!(out.height(), ten_minute_grid().len());
    assert!(floats(&out, TEMPERATURE).iter().all(Option::is_none));
    assert!(floats(&out, DEW_POINT).iter().all(Option::is_none));
}
