// crates/chorus-core/src/config.rs

use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datalogger::DEFAULT_TOLERANCE_MINUTES;
use crate::harmonize::HarmonizeOptions;
use crate::inference::InferenceAggregation;
use crate::schema::{
    datalogger_schema, inference_schema, weather_station_schema, SourceSchema, DEFAULT_SPECIES,
};
use crate::time_grid::{GridStep, DEFAULT_STEP_MINUTES};
use crate::weather_station::{UtcOffset, WeatherTimestamps, DEFAULT_UTC_OFFSET_HOURS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
    #[error("invalid grid step '{0}'")]
    InvalidStep(String),
    #[error("datalogger tolerance must be a non-negative number of minutes, got {0}")]
    InvalidTolerance(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizeConfig {
    pub step: String,
    pub datalogger_tolerance_minutes: i64,
    pub inference_aggregation: InferenceAggregation,
    pub species: Vec<String>,
    pub weather_station: WeatherStationConfig,
    pub schemas: SchemaOverrides,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            step: format!("{DEFAULT_STEP_MINUTES}min"),
            datalogger_tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            inference_aggregation: InferenceAggregation::default(),
            species: DEFAULT_SPECIES.iter().map(|s| s.to_string()).collect(),
            weather_station: WeatherStationConfig::default(),
            schemas: SchemaOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherStationConfig {
    pub utc_offset_hours: i32,
    /// IANA zone name; takes precedence over `utc_offset_hours`.
    pub timezone: Option<String>,
    /// Integer `HHMM` column paired with a date column, for stations that split the two.
    pub hour_code_column: Option<String>,
}

impl Default for WeatherStationConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            timezone: None,
            hour_code_column: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOverrides {
    pub inference: Option<SourceSchema>,
    pub datalogger: Option<SourceSchema>,
    pub weather_station: Option<SourceSchema>,
}

impl HarmonizeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolves the textual settings into harmonizer options.
    pub fn options(&self) -> Result<HarmonizeOptions, ConfigError> {
        let step =
            GridStep::parse(&self.step).map_err(|_| ConfigError::InvalidStep(self.step.clone()))?;

        let datalogger_tolerance = Duration::try_minutes(self.datalogger_tolerance_minutes)
            .filter(|tolerance| *tolerance >= Duration::zero())
            .ok_or(ConfigError::InvalidTolerance(
                self.datalogger_tolerance_minutes,
            ))?;

        let utc_offset = match &self.weather_station.timezone {
            Some(name) => UtcOffset::Zone(
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::UnknownTimezone(name.clone()))?,
            ),
            None => UtcOffset::FixedHours(self.weather_station.utc_offset_hours),
        };

        let weather_timestamps = match &self.weather_station.hour_code_column {
            Some(column) => WeatherTimestamps::DateHourCode {
                hour_code: column.clone(),
            },
            None => WeatherTimestamps::Timestamp,
        };

        Ok(HarmonizeOptions {
            step,
            datalogger_tolerance,
            inference_aggregation: self.inference_aggregation,
            utc_offset,
            weather_timestamps,
            inference_schema: self
                .schemas
                .inference
                .clone()
                .unwrap_or_else(|| inference_schema(&self.species)),
            datalogger_schema: self
                .schemas
                .datalogger
                .clone()
                .unwrap_or_else(datalogger_schema),
            weather_station_schema: self
                .schemas
                .weather_station
                .clone()
                .unwrap_or_else(weather_station_schema),
        })
    }
}
