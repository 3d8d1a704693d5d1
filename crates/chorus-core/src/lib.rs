pub mod climate;
pub mod config;
pub mod datalogger;
pub mod date_range;
pub mod ebv;
pub mod error;
mod frame;
pub mod harmonize;
pub mod inference;
pub mod interpolation;
pub mod metadata;
pub mod schema;
pub mod time_grid;
pub mod weather_station;

pub use climate::combine_climate;
pub use config::{ConfigError, HarmonizeConfig};
pub use error::{HarmonizeError, Result};
pub use frame::{DATE_COLUMN, GRID_COLUMNS, TIMESTAMP_COLUMN, TIME_COLUMN};
pub use harmonize::{harmonize, HarmonizeOptions, HarmonizedTables};
pub use schema::{FieldKind, FieldMapping, SourceSchema};
pub use time_grid::{GridStep, TimeGrid};
