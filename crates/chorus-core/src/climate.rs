//! Merges the grid-aligned datalogger and weather-station tables into one climate table.
//!
//! Source priority is deliberately asymmetric:
//!
//! | variable          | source                                                         |
//! |-------------------|----------------------------------------------------------------|
//! | temperature       | datalogger, else mean of station max/min, else station max     |
//! | relative humidity | datalogger only                                                |
//! | dew point         | datalogger only                                                |
//! | rainfall          | weather station only (dataloggers carry no rain gauge)         |

use polars::prelude::*;
use tracing::{info, instrument};

use crate::error::{HarmonizeError, Result};
use crate::frame::{read_floats_or_nulls, require_column, GRID_COLUMNS, TIMESTAMP_COLUMN};
use crate::schema::{
    DEW_POINT, RAINFALL, RELATIVE_HUMIDITY, TEMPERATURE, TEMPERATURE_MAX, TEMPERATURE_MIN,
};

pub const CLIMATE_VARIABLES: [&str; 4] = [TEMPERATURE, RELATIVE_HUMIDITY, DEW_POINT, RAINFALL];

/// Temperature by source priority.
pub fn prioritized_temperature(
    datalogger: Option<f64>,
    station_max: Option<f64>,
    station_min: Option<f64>,
) -> Option<f64> {
    match (datalogger, station_max, station_min) {
        (Some(value), _, _) => Some(value),
        (None, Some(max), Some(min)) => Some((max + min) / 2.0),
        (None, Some(max), None) => Some(max),
        _ => None,
    }
}

/// Builds the climate table. Without a weather-station table the station-backed cells are
/// null and temperature comes from the datalogger alone.
#[instrument(skip_all, fields(rows = datalogger.height(), weather_station = weather_station.is_some()))]
pub fn combine_climate(
    datalogger: &DataFrame,
    weather_station: Option<&DataFrame>,
) -> Result<DataFrame> {
    let len = datalogger.height();

    if let Some(station) = weather_station {
        if station.height() != len {
            return Err(HarmonizeError::LengthMismatch {
                table: "weather_station",
                expected: len,
                found: station.height(),
            });
        }
        let dl_axis = require_column(datalogger, "datalogger", TIMESTAMP_COLUMN)?;
        let ws_axis = require_column(station, "weather_station", TIMESTAMP_COLUMN)?;
        if !dl_axis
            .as_materialized_series()
            .equals_missing(ws_axis.as_materialized_series())
        {
            return Err(HarmonizeError::GridMismatch {
                table: "weather_station",
            });
        }
    }

    let station_floats = |name: &str| -> Result<Vec<Option<f64>>> {
        match weather_station {
            Some(station) => read_floats_or_nulls(station, name),
            None => Ok(vec![None; len]),
        }
    };

    let dl_temperature = read_floats_or_nulls(datalogger, TEMPERATURE)?;
    let ws_max = station_floats(TEMPERATURE_MAX)?;
    let ws_min = station_floats(TEMPERATURE_MIN)?;

    let mut temperature = Vec::with_capacity(len);
    let mut from_station = 0usize;
    for idx in 0..len {
        let value = prioritized_temperature(dl_temperature[idx], ws_max[idx], ws_min[idx]);
        if dl_temperature[idx].is_none() && value.is_some() {
            from_station += 1;
        }
        temperature.push(value);
    }

    let mut columns = Vec::with_capacity(GRID_COLUMNS.len() + CLIMATE_VARIABLES.len());
    for name in GRID_COLUMNS {
        columns.push(require_column(datalogger, "datalogger", name)?.clone());
    }
    columns.push(Series::new(TEMPERATURE.into(), temperature).into());
    columns.push(
        Series::new(
            RELATIVE_HUMIDITY.into(),
            read_floats_or_nulls(datalogger, RELATIVE_HUMIDITY)?,
        )
        .into(),
    );
    columns.push(
        Series::new(DEW_POINT.into(), read_floats_or_nulls(datalogger, DEW_POINT)?).into(),
    );
    columns.push(Series::new(RAINFALL.into(), station_floats(RAINFALL)?).into());

    info!(from_station, "combined climate variables");

    Ok(DataFrame::new(columns)?)
}
