use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::frame::require_column;

const TABLE: &str = "metadata";

pub const LOCATION_ID_COLUMN: &str = "location_ID";
pub const NAME_COLUMN: &str = "name_ID";
pub const DATALOGGER_LAT_COLUMN: &str = "lat_DL";
pub const DATALOGGER_LON_COLUMN: &str = "lon_DL";
pub const HAS_WEATHER_STATION_COLUMN: &str = "WStation";
pub const WEATHER_STATION_LAT_COLUMN: &str = "lat_WS";
pub const WEATHER_STATION_LON_COLUMN: &str = "lon_WS";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Recording location: where its datalogger sits and, when one serves the site, where the
/// weather station is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub location_id: String,
    pub name: Option<String>,
    pub datalogger: Option<Coordinates>,
    pub weather_station: Option<Coordinates>,
}

impl SiteMetadata {
    pub fn has_weather_station(&self) -> bool {
        self.weather_station.is_some()
    }

    /// First row of `frame` whose location id equals `location_id`, or `None`.
    pub fn from_frame(frame: &DataFrame, location_id: &str) -> Result<Option<Self>> {
        if frame.height() == 0 {
            warn!(location_id, "metadata table is empty");
            return Ok(None);
        }

        let ids = require_column(frame, TABLE, LOCATION_ID_COLUMN)?.cast(&DataType::String)?;
        let Some(row) = ids.str()?.into_iter().position(|id| id == Some(location_id)) else {
            return Ok(None);
        };

        let text = |name: &str| -> Result<Option<String>> {
            if frame.get_column_index(name).is_none() {
                return Ok(None);
            }
            let column = frame.column(name)?.cast(&DataType::String)?;
            Ok(column.str()?.get(row).map(str::to_string))
        };
        let number = |name: &str| -> Result<Option<f64>> {
            if frame.get_column_index(name).is_none() {
                return Ok(None);
            }
            let column = frame.column(name)?.cast(&DataType::Float64)?;
            Ok(column.f64()?.get(row).filter(|v| v.is_finite()))
        };
        let coordinates = |lat: &str, lon: &str| -> Result<Option<Coordinates>> {
            Ok(match (number(lat)?, number(lon)?) {
                (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                _ => None,
            })
        };

        let flagged = match text(HAS_WEATHER_STATION_COLUMN)? {
            Some(flag) => parse_flag(&flag),
            None => false,
        };
        let weather_station = if flagged {
            let coords = coordinates(WEATHER_STATION_LAT_COLUMN, WEATHER_STATION_LON_COLUMN)?;
            if coords.is_none() {
                warn!(location_id, "weather station flagged without coordinates");
            }
            coords
        } else {
            None
        };

        Ok(Some(Self {
            location_id: location_id.to_string(),
            name: text(NAME_COLUMN)?,
            datalogger: coordinates(DATALOGGER_LAT_COLUMN, DATALOGGER_LON_COLUMN)?,
            weather_station,
        }))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "1.0" | "yes" | "y"
    )
}
