//! Declarative mapping from source column names to canonical fields.
//!
//! Each harmonizer consults a [`SourceSchema`] once to decide which raw columns it reads,
//! what they are called in the harmonized table and which type they are coerced to.

use once_cell::sync::Lazy;
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::frame::TIMESTAMP_COLUMN;

pub const TEMPERATURE: &str = "temperature_c";
pub const TEMPERATURE_MAX: &str = "temperature_max_c";
pub const TEMPERATURE_MIN: &str = "temperature_min_c";
pub const RELATIVE_HUMIDITY: &str = "relative_humidity_pct";
pub const RELATIVE_HUMIDITY_MAX: &str = "relative_humidity_max_pct";
pub const RELATIVE_HUMIDITY_MIN: &str = "relative_humidity_min_pct";
pub const DEW_POINT: &str = "dew_point_c";
pub const DEW_POINT_MAX: &str = "dew_point_max_c";
pub const DEW_POINT_MIN: &str = "dew_point_min_c";
pub const PRESSURE: &str = "pressure_hpa";
pub const PRESSURE_MAX: &str = "pressure_max_hpa";
pub const PRESSURE_MIN: &str = "pressure_min_hpa";
pub const WIND_SPEED: &str = "wind_speed_m_s";
pub const WIND_DIRECTION: &str = "wind_direction";
pub const WIND_GUST: &str = "wind_gust_m_s";
pub const SOLAR_RADIATION: &str = "solar_radiation_kj_m2";
pub const RAINFALL: &str = "rainfall_mm";
pub const FILE_NAME: &str = "file_name";

/// Species codes scored by the acoustic classifier.
pub const DEFAULT_SPECIES: &[&str] = &[
    "SPHSUR", "BOABIS", "SCIPER", "DENNAH", "LEPLAT", "RHIICT", "BOALEP", "BOAFAB", "PHYCUV",
    "DENMIN", "ELABIC", "BOAPRA", "DENCRU", "BOALUN", "BOAALB", "PHYMAR", "PITAZU", "PHYSAU",
    "LEPFUS", "DENNAN", "PHYALB", "LEPLAB", "SCIFUS", "BOARAN", "SCIFUV", "AMEPIC", "LEPPOD",
    "ADEDIP", "ELAMAT", "PHYNAT", "LEPELE", "RHISCI", "SCINAS", "LEPNOT", "ADEMAR", "BOAALM",
    "PHYDIS", "RHIORN", "LEPFLA", "SCIRIZ", "DENELE", "SCIALT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Float,
    Integer,
    Text,
    Boolean,
}

impl FieldKind {
    pub fn data_type(&self) -> DataType {
        match self {
            FieldKind::Float => DataType::Float64,
            FieldKind::Integer => DataType::Int64,
            FieldKind::Text => DataType::String,
            FieldKind::Boolean => DataType::Boolean,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Float | FieldKind::Integer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub canonical: String,
    pub source: String,
    pub kind: FieldKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl FieldMapping {
    pub fn new(canonical: impl Into<String>, source: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            canonical: canonical.into(),
            source: source.into(),
            kind,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    /// Raw column holding the observation instant (or the calendar date for hour-coded
    /// weather-station tables).
    #[serde(default = "default_timestamp")]
    pub timestamp: String,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

fn default_timestamp() -> String {
    TIMESTAMP_COLUMN.to_string()
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp(),
            fields: Vec::new(),
        }
    }
}

impl SourceSchema {
    pub fn new(fields: Vec<FieldMapping>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, column: impl Into<String>) -> Self {
        self.timestamp = column.into();
        self
    }

    /// Adds `field`, replacing any existing mapping with the same canonical name.
    pub fn with_field(mut self, field: FieldMapping) -> Self {
        match self
            .fields
            .iter_mut()
            .find(|existing| existing.canonical == field.canonical)
        {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn disable(mut self, canonical: &str) -> Self {
        for field in self.fields.iter_mut().filter(|f| f.canonical == canonical) {
            field.enabled = false;
        }
        self
    }

    pub fn field(&self, canonical: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.canonical == canonical)
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().filter(|f| f.enabled)
    }

    /// Enabled mappings whose source column exists in `frame`.
    pub fn resolve(&self, frame: &DataFrame, table: &'static str) -> Vec<&FieldMapping> {
        self.enabled_fields()
            .filter(|field| {
                let present = frame.get_column_index(&field.source).is_some();
                if !present {
                    warn!(
                        table,
                        source = %field.source,
                        canonical = %field.canonical,
                        "enabled field missing from source table"
                    );
                }
                present
            })
            .collect()
    }
}

/// Presence columns for `species` (source name equals canonical name) plus the disabled
/// audio file name.
pub fn inference_schema<S: AsRef<str>>(species: &[S]) -> SourceSchema {
    let mut fields: Vec<FieldMapping> = species
        .iter()
        .map(|code| FieldMapping::new(code.as_ref(), code.as_ref(), FieldKind::Float))
        .collect();
    fields.push(FieldMapping::new(FILE_NAME, "fname", FieldKind::Text).disabled());
    SourceSchema::new(fields)
}

static DATALOGGER_SCHEMA: Lazy<SourceSchema> = Lazy::new(|| {
    use FieldKind::Float;

    SourceSchema::new(vec![
        FieldMapping::new(TEMPERATURE, "T(C)_DL", Float),
        FieldMapping::new(RELATIVE_HUMIDITY, "RH(%)_DL", Float),
        FieldMapping::new(DEW_POINT, "DP(C)_DL", Float),
    ])
});

static WEATHER_STATION_SCHEMA: Lazy<SourceSchema> = Lazy::new(|| {
    use FieldKind::Float;

    SourceSchema::new(vec![
        FieldMapping::new(TEMPERATURE, "T(C)_WS", Float),
        FieldMapping::new(TEMPERATURE_MAX, "T_max(C)_WS", Float),
        FieldMapping::new(TEMPERATURE_MIN, "T_min(C)_WS", Float),
        FieldMapping::new(RELATIVE_HUMIDITY, "RH(%)_WS", Float),
        FieldMapping::new(RELATIVE_HUMIDITY_MAX, "RH_max(%)_WS", Float),
        FieldMapping::new(RELATIVE_HUMIDITY_MIN, "RH_min(%)_WS", Float),
        FieldMapping::new(DEW_POINT, "DP(C)_WS", Float),
        FieldMapping::new(DEW_POINT_MAX, "DP_max(C)_WS", Float),
        FieldMapping::new(DEW_POINT_MIN, "DP_min(C)_WS", Float),
        FieldMapping::new(PRESSURE, "ATM(hPa)_WS", Float),
        FieldMapping::new(PRESSURE_MAX, "ATM_max(hPa)_WS", Float),
        FieldMapping::new(PRESSURE_MIN, "ATM_min(hPa)_WS", Float),
        FieldMapping::new(WIND_SPEED, "WND(m/s)_WS", Float),
        FieldMapping::new(WIND_DIRECTION, "WND2(m/s)_WS", Float).disabled(),
        FieldMapping::new(WIND_GUST, "WND3(m/s)_WS", Float).disabled(),
        FieldMapping::new(SOLAR_RADIATION, "Radiant(KJ/m²)_WS", Float),
        FieldMapping::new(RAINFALL, "Rainfall(mm)_WS", Float),
    ])
});

pub fn datalogger_schema() -> SourceSchema {
    DATALOGGER_SCHEMA.clone()
}

pub fn weather_station_schema() -> SourceSchema {
    WEATHER_STATION_SCHEMA.clone()
}
