//! Selection of the requested date window from a loaded source table.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use crate::error::{HarmonizeError, Result};
use crate::frame::read_timestamps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(HarmonizeError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses inclusive `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |bound: &'static str, input: &str| {
            NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
                HarmonizeError::InvalidDate {
                    bound,
                    input: input.to_string(),
                }
            })
        };
        Self::new(parse("start", start)?, parse("end", end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct DateSelection {
    pub frame: DataFrame,
    pub requested: DateRange,
    /// The requested range clamped to the dates present in the table; `None` when nothing
    /// overlaps.
    pub effective: Option<DateRange>,
}

impl DateSelection {
    pub fn is_clamped(&self) -> bool {
        self.effective != Some(self.requested)
    }
}

/// Rows of `frame` whose `column` date falls inside `range`.
pub fn select_date_range(
    frame: &DataFrame,
    table: &'static str,
    column: &str,
    range: DateRange,
) -> Result<DateSelection> {
    if frame.height() == 0 {
        info!(table, "no records found");
        return Ok(DateSelection {
            frame: frame.clone(),
            requested: range,
            effective: None,
        });
    }

    let dates: Vec<Option<NaiveDate>> = read_timestamps(frame, table, column)?
        .into_iter()
        .map(|ts| ts.map(|ts| ts.date()))
        .collect();

    let first = dates.iter().flatten().min().copied();
    let last = dates.iter().flatten().max().copied();

    let effective = match (first, last) {
        (Some(first), Some(last)) => {
            let start = range.start.max(first);
            let end = range.end.min(last);
            if start > range.start {
                info!(table, requested = %range.start, available = %start, "records only available since a later date");
            }
            if end < range.end {
                info!(table, requested = %range.end, available = %end, "records only available up to an earlier date");
            }
            (start <= end).then_some(DateRange { start, end })
        }
        _ => None,
    };

    let mask: BooleanChunked = dates
        .iter()
        .map(|date| date.is_some_and(|d| range.contains(d)))
        .collect();
    let selected = frame.filter(&mask)?;

    info!(table, rows = selected.height(), "selected date range");

    Ok(DateSelection {
        frame: selected,
        requested: range,
        effective,
    })
}
