// crates/chorus-core/src/error.rs

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum HarmonizeError {
    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("{table} table is missing column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    #[error("invalid grid step '{0}'")]
    InvalidStep(String),

    #[error("invalid {bound} date '{input}', expected YYYY-MM-DD")]
    InvalidDate { bound: &'static str, input: String },

    #[error("date range starts at {start} but ends at {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("{table} table has {found} rows, expected {expected} grid rows")]
    LengthMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{table} table is not aligned to the same time grid")]
    GridMismatch { table: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
