mod common;

use chorus_core::{GridStep, HarmonizeError, TimeGrid, DATE_COLUMN, TIMESTAMP_COLUMN, TIME_COLUMN};
use chrono::{Duration, NaiveDate, NaiveTime};
use polars::prelude::*;
use proptest::prelude::*;

use common::{at, datetime_column, day};

#[test]
fn step_parsing_accepts_common_spellings() {
    assert_eq!(GridStep::parse("15min").unwrap().duration(), Duration::minutes(15));
    assert_eq!(GridStep::parse("1h").unwrap().duration(), Duration::hours(1));
    assert_eq!(GridStep::parse("90s").unwrap().duration(), Duration::seconds(90));
    assert_eq!(GridStep::parse(" 30 ").unwrap().duration(), Duration::minutes(30));
    assert_eq!("10min".parse::<GridStep>().unwrap().to_string(), "10min");
    assert_eq!(GridStep::default().steps_per_day(), 96);
}

#[test]
fn step_parsing_rejects_zero_and_garbage() {
    for input in [
        "0min",
        "abc",
        "15x",
        "",
        "-5min",
        "9999999999999999min",
        "9999999999999999h",
        "9999999999999999999s",
    ] {
        assert!(
            matches!(GridStep::parse(input), Err(HarmonizeError::InvalidStep(_))),
            "{input} should be rejected"
        );
    }
    assert!(matches!(
        GridStep::minutes(i64::MAX),
        Err(HarmonizeError::InvalidStep(_))
    ));
}

#[test]
fn grid_covers_every_day_between_first_and_last_observation() {
    let observed = [at("2022-03-02 13:07"), at("2022-03-01 00:00")];
    let grid = TimeGrid::from_observations(&observed, GridStep::default());

    assert_eq!(grid.len(), 2 * 96);
    assert_eq!(grid.timestamps()[0], at("2022-03-01 00:00"));
    assert_eq!(grid.timestamps()[grid.len() - 1], at("2022-03-02 23:45"));
    assert_eq!(grid.dates()[96], day("2022-03-02"));
    assert_eq!(grid.times()[1], NaiveTime::from_hms_opt(0, 15, 0).unwrap());
}

#[test]
fn grid_starts_at_the_first_observation() {
    let observed = [at("2022-03-01 06:00"), at("2022-03-01 07:30")];
    let grid = TimeGrid::from_observations(&observed, GridStep::default());

    assert_eq!(grid.len(), 96 - 24);
    assert_eq!(grid.timestamps()[0], at("2022-03-01 06:00"));
}

#[test]
fn off_step_start_shifts_every_day() {
    let observed = [at("2022-03-01 08:07"), at("2022-03-02 10:00")];
    let grid = TimeGrid::from_observations(&observed, GridStep::default());

    // 08:07..=23:52 on day one, then 00:07..=23:52 on day two
    assert_eq!(grid.len(), 64 + 96);
    assert_eq!(grid.timestamps()[64], at("2022-03-02 00:07"));
    assert_eq!(grid.timestamps()[65], at("2022-03-02 00:22"));
    assert_eq!(grid.position(at("2022-03-02 00:00")), None);
}

#[test]
fn degenerate_inputs_give_degenerate_grids() {
    let step = GridStep::default();
    assert!(TimeGrid::from_observations(&[], step).is_empty());

    let single = TimeGrid::from_observations(&[at("2022-03-01 10:00")], step);
    assert_eq!(single.timestamps(), &[at("2022-03-01 10:00")]);
}

#[test]
fn slots_are_half_open() {
    let grid = TimeGrid::from_observations(
        &[at("2022-03-01 00:00"), at("2022-03-01 01:00")],
        GridStep::default(),
    );
    assert_eq!(grid.slot_of(at("2022-03-01 00:14")), Some(0));
    assert_eq!(grid.slot_of(at("2022-03-01 00:15")), Some(1));
    assert_eq!(grid.position(at("2022-03-01 00:30")), Some(2));
    assert_eq!(grid.position(at("2022-03-01 00:31")), None);
    assert_eq!(grid.slot_of(at("2022-02-28 23:59")), None);
}

#[test]
fn grid_frame_carries_typed_grid_columns() -> PolarsResult<()> {
    let frame = DataFrame::new(vec![datetime_column(
        "timestamp",
        &["2022-03-01 00:00", "2022-03-01 12:00"],
    )])?;
    let grid = TimeGrid::from_frame(&frame, "timestamp", GridStep::minutes(60).unwrap()).unwrap();
    let out = grid.to_frame()?;

    assert_eq!(out.height(), 24);
    assert_eq!(
        out.column(TIMESTAMP_COLUMN)?.dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );
    assert_eq!(out.column(DATE_COLUMN)?.dtype(), &DataType::Date);
    assert_eq!(out.column(TIME_COLUMN)?.dtype(), &DataType::Time);
    Ok(())
}

#[test]
fn empty_table_yields_empty_grid() {
    let frame = DataFrame::new(vec![datetime_column("timestamp", &[])]).unwrap();
    let grid = TimeGrid::from_frame(&frame, "timestamp", GridStep::default()).unwrap();
    assert!(grid.is_empty());
}

proptest! {
    #[test]
    fn grid_is_uniform(
        start_minute in 0i64..1440,
        extra_days in 0i64..4,
        step_minutes in prop::sample::select(vec![1i64, 5, 10, 15, 20, 30, 45, 60, 90]),
    ) {
        let first_day = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        let start = first_day.and_time(NaiveTime::MIN) + Duration::minutes(start_minute);
        let last_date = start.date() + Duration::days(extra_days);
        let step = GridStep::minutes(step_minutes).unwrap();

        let grid = TimeGrid::from_span(start, last_date, step);
        let end = (last_date + Duration::days(1)).and_time(NaiveTime::MIN);

        prop_assert!(!grid.is_empty());
        prop_assert_eq!(grid.timestamps()[0], start);
        for pair in grid.timestamps().windows(2) {
            prop_assert_eq!(pair[1] - pair[0], step.duration());
        }
        let last = grid.timestamps()[grid.len() - 1];
        prop_assert!(last < end);
        prop_assert!(last + step.duration() >= end);
    }
}
