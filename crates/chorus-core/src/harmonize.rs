//! Builds the grid once from the inference table and aligns every source onto it.

use chrono::Duration;
use polars::prelude::DataFrame;
use tracing::{info, instrument};

use crate::datalogger::{default_tolerance, harmonize_datalogger};
use crate::error::Result;
use crate::inference::{harmonize_inference, InferenceAggregation};
use crate::schema::{
    datalogger_schema, inference_schema, weather_station_schema, SourceSchema, DEFAULT_SPECIES,
};
use crate::time_grid::{GridStep, TimeGrid};
use crate::weather_station::{harmonize_weather_station, UtcOffset, WeatherTimestamps};

#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizeOptions {
    pub step: GridStep,
    pub datalogger_tolerance: Duration,
    pub inference_aggregation: InferenceAggregation,
    pub utc_offset: UtcOffset,
    pub weather_timestamps: WeatherTimestamps,
    pub inference_schema: SourceSchema,
    pub datalogger_schema: SourceSchema,
    pub weather_station_schema: SourceSchema,
}

impl Default for HarmonizeOptions {
    fn default() -> Self {
        Self {
            step: GridStep::default(),
            datalogger_tolerance: default_tolerance(),
            inference_aggregation: InferenceAggregation::default(),
            utc_offset: UtcOffset::default(),
            weather_timestamps: WeatherTimestamps::default(),
            inference_schema: inference_schema(DEFAULT_SPECIES),
            datalogger_schema: datalogger_schema(),
            weather_station_schema: weather_station_schema(),
        }
    }
}

impl HarmonizeOptions {
    pub fn with_step(mut self, step: GridStep) -> Self {
        self.step = step;
        self
    }
}

/// Grid-aligned outputs. Every table has `grid.len()` rows in grid order.
#[derive(Debug, Clone)]
pub struct HarmonizedTables {
    pub grid: TimeGrid,
    pub inference: DataFrame,
    pub datalogger: DataFrame,
    pub weather_station: Option<DataFrame>,
}

#[instrument(skip_all, fields(step = %options.step, weather_station = weather_station.is_some()))]
pub fn harmonize(
    inference: &DataFrame,
    datalogger: &DataFrame,
    weather_station: Option<&DataFrame>,
    options: &HarmonizeOptions,
) -> Result<HarmonizedTables> {
    let grid = TimeGrid::from_frame(inference, &options.inference_schema.timestamp, options.step)?;

    let inference_h = harmonize_inference(
        inference,
        &grid,
        &options.inference_schema,
        options.inference_aggregation,
    )?;
    let datalogger_h = harmonize_datalogger(
        datalogger,
        &grid,
        &options.datalogger_schema,
        options.datalogger_tolerance,
    )?;
    let weather_station_h = weather_station
        .map(|raw| {
            harmonize_weather_station(
                raw,
                &grid,
                &options.weather_station_schema,
                &options.weather_timestamps,
                options.utc_offset,
            )
        })
        .transpose()?;

    info!(rows = grid.len(), "harmonization complete");

    Ok(HarmonizedTables {
        grid,
        inference: inference_h,
        datalogger: datalogger_h,
        weather_station: weather_station_h,
    })
}
