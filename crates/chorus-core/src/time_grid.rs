//! Canonical fixed-interval time axis shared by every harmonized table.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::{DataFrame, PolarsResult};
use tracing::{debug, warn};

use crate::error::{HarmonizeError, Result};
use crate::frame::{grid_columns, read_timestamps};

pub const DEFAULT_STEP_MINUTES: i64 = 15;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridStep(Duration);

impl GridStep {
    pub fn minutes(minutes: i64) -> Result<Self> {
        let duration = Duration::try_minutes(minutes)
            .ok_or_else(|| HarmonizeError::InvalidStep(format!("{minutes}min")))?;
        Self::from_duration(duration)
    }

    pub fn from_duration(duration: Duration) -> Result<Self> {
        if duration <= Duration::zero() {
            return Err(HarmonizeError::InvalidStep(format!(
                "{}s",
                duration.num_seconds()
            )));
        }
        Ok(Self(duration))
    }

    /// Parses `15min`, `1h`, `90s` or a bare number of minutes.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || HarmonizeError::InvalidStep(input.to_string());

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let amount: i64 = digits.parse().map_err(|_| invalid())?;

        let duration = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "m" | "min" | "mins" | "minute" | "minutes" | "t" => Duration::try_minutes(amount),
            "h" | "hr" | "hour" | "hours" => Duration::try_hours(amount),
            "s" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(amount),
            _ => return Err(invalid()),
        }
        .ok_or_else(invalid)?;
        Self::from_duration(duration).map_err(|_| invalid())
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Whole steps that fit in one day.
    pub fn steps_per_day(&self) -> i64 {
        SECONDS_PER_DAY / self.0.num_seconds().max(1)
    }
}

impl Default for GridStep {
    fn default() -> Self {
        Self(Duration::minutes(DEFAULT_STEP_MINUTES))
    }
}

impl fmt::Display for GridStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.num_seconds();
        if secs % 60 == 0 {
            write!(f, "{}min", secs / 60)
        } else {
            write!(f, "{secs}s")
        }
    }
}

impl FromStr for GridStep {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Strictly increasing timestamps at a fixed step, with the date and time-of-day parts
/// kept index-aligned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeGrid {
    step: GridStep,
    timestamps: Vec<NaiveDateTime>,
    dates: Vec<NaiveDate>,
    times: Vec<NaiveTime>,
}

impl TimeGrid {
    pub fn empty(step: GridStep) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    /// Steps from `start` until the end of `last_date`. The first instant keeps its own
    /// time-of-day, so a non-midnight start truncates day one.
    pub fn from_span(start: NaiveDateTime, last_date: NaiveDate, step: GridStep) -> Self {
        let end = last_date
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN);

        let span_secs = (end - start).num_seconds().max(0);
        let capacity = (span_secs / step.0.num_seconds() + 1) as usize;

        let mut timestamps = Vec::with_capacity(capacity);
        let mut current = start;
        while current < end {
            timestamps.push(current);
            match current.checked_add_signed(step.0) {
                Some(next) => current = next,
                None => break,
            }
        }

        Self::from_instants(timestamps, step)
    }

    /// Grid spanning the observed instants. Zero or one instant yields a degenerate grid of
    /// the same length.
    pub fn from_observations(observed: &[NaiveDateTime], step: GridStep) -> Self {
        let first = observed.iter().min().copied();
        let last = observed.iter().max().copied();
        match (first, last) {
            (Some(first), Some(_)) if observed.len() == 1 => {
                Self::from_instants(vec![first], step)
            }
            (Some(first), Some(last)) => Self::from_span(first, last.date(), step),
            _ => Self::empty(step),
        }
    }

    /// Builds the grid from a table's timestamp column; null timestamps are ignored.
    pub fn from_frame(frame: &DataFrame, column: &str, step: GridStep) -> Result<Self> {
        if frame.height() == 0 {
            warn!("inference table is empty; time grid is empty");
            return Ok(Self::empty(step));
        }
        let observed: Vec<NaiveDateTime> = read_timestamps(frame, "inference", column)?
            .into_iter()
            .flatten()
            .collect();
        let grid = Self::from_observations(&observed, step);
        debug!(
            points = grid.len(),
            step = %step,
            first = ?grid.timestamps.first(),
            last = ?grid.timestamps.last(),
            "built time grid"
        );
        Ok(grid)
    }

    fn from_instants(timestamps: Vec<NaiveDateTime>, step: GridStep) -> Self {
        let dates = timestamps.iter().map(NaiveDateTime::date).collect();
        let times = timestamps.iter().map(NaiveDateTime::time).collect();
        Self {
            step,
            timestamps,
            dates,
            times,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn step(&self) -> GridStep {
        self.step
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    pub fn position(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    /// Index of the slot `[t, t + step)` containing `timestamp`.
    pub fn slot_of(&self, timestamp: NaiveDateTime) -> Option<usize> {
        let idx = self
            .timestamps
            .partition_point(|t| *t <= timestamp)
            .checked_sub(1)?;
        (timestamp - self.timestamps[idx] < self.step.0).then_some(idx)
    }

    /// The `timestamp`, `date` and `time` columns as a table.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(grid_columns(&self.timestamps)?)
    }
}
