//! Assembly of the EBV-ready table: grid columns, selected species presence and climate.

use polars::prelude::*;
use tracing::warn;

use crate::error::{HarmonizeError, Result};
use crate::frame::{require_column, GRID_COLUMNS};

pub fn assemble_ebv_ready<S: AsRef<str>>(
    inference: &DataFrame,
    climate: &DataFrame,
    species: &[S],
) -> Result<DataFrame> {
    if climate.height() != inference.height() {
        return Err(HarmonizeError::LengthMismatch {
            table: "climate",
            expected: inference.height(),
            found: climate.height(),
        });
    }

    let mut columns: Vec<Column> = Vec::with_capacity(GRID_COLUMNS.len() + species.len());
    for name in GRID_COLUMNS {
        columns.push(require_column(inference, "inference", name)?.clone());
    }

    for code in species {
        let code = code.as_ref();
        match inference.column(code) {
            Ok(column) => columns.push(column.clone()),
            Err(_) => warn!(species = code, "species missing from harmonized inference table"),
        }
    }

    for column in climate.get_columns() {
        if !GRID_COLUMNS.contains(&column.name().as_str()) {
            columns.push(column.clone());
        }
    }

    Ok(DataFrame::new(columns)?)
}
