//! Aggregation of classifier presence/absence outputs onto the time grid.
//!
//! Inference windows are finer than the grid step and are not interpolated. With the default
//! [`InferenceAggregation::DailyMax`] every grid row of a date carries the maximum over all of
//! that date's windows, i.e. "heard at least once that day"; the time of the detection within
//! the day is discarded.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::frame::{
    grid_frame, read_timestamps, require_column, FieldValues, TIMESTAMP_COLUMN, TIME_COLUMN,
};
use crate::schema::SourceSchema;
use crate::time_grid::TimeGrid;

const TABLE: &str = "inference";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceAggregation {
    /// Maximum over the whole calendar date, written to every grid row of that date.
    #[default]
    DailyMax,
    /// Maximum over the windows falling in each grid slot `[t, t + step)`.
    SlotMax,
}

/// Raw rows sharing an aggregation key, and the grid rows that receive the aggregate.
struct Group {
    rows: Vec<usize>,
    targets: Vec<usize>,
}

#[instrument(skip_all, fields(rows = raw.height(), grid = grid.len(), ?aggregation))]
pub fn harmonize_inference(
    raw: &DataFrame,
    grid: &TimeGrid,
    schema: &SourceSchema,
    aggregation: InferenceAggregation,
) -> Result<DataFrame> {
    let len = grid.len();

    if raw.height() == 0 {
        warn!("inference table is empty; harmonized presence columns are null");
        let fields = schema
            .enabled_fields()
            .map(|field| (field.canonical.clone(), FieldValues::nulls(field.kind, len)))
            .collect();
        return Ok(grid_frame(grid.timestamps(), fields)?);
    }

    let mapped = schema.resolve(raw, TABLE);
    let timestamps = read_timestamps(raw, TABLE, &schema.timestamp)?;

    let mut ordered: Vec<(NaiveDateTime, usize)> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(idx, ts)| ts.map(|ts| (ts, idx)))
        .collect();
    let skipped = raw.height() - ordered.len();
    if skipped > 0 {
        warn!(skipped, "inference rows without timestamp ignored");
    }
    ordered.sort_by_key(|(ts, _)| *ts);

    let groups = match aggregation {
        InferenceAggregation::DailyMax => daily_groups(&ordered, grid),
        InferenceAggregation::SlotMax => slot_groups(&ordered, grid),
    };

    let mut fields = Vec::with_capacity(mapped.len());
    for field in mapped {
        let column = require_column(raw, TABLE, &field.source)?;
        let source = FieldValues::extract(column, field.kind)?;
        let mut output = FieldValues::nulls(field.kind, len);
        let mut aggregate = FieldValues::nulls(field.kind, 1);
        for group in &groups {
            aggregate.max_into(0, &source, &group.rows);
            for &target in &group.targets {
                output.copy_from(target, &aggregate, 0);
            }
        }
        fields.push((field.canonical.clone(), output));
    }

    let covered: usize = groups.iter().map(|g| g.targets.len()).sum();
    info!(covered, "harmonized inference table");

    Ok(grid_frame(grid.timestamps(), fields)?)
}

fn daily_groups(ordered: &[(NaiveDateTime, usize)], grid: &TimeGrid) -> Vec<Group> {
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for &(ts, row) in ordered {
        let slot = *by_date.entry(ts.date()).or_insert_with(|| {
            groups.push(Group {
                rows: Vec::new(),
                targets: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }

    for (pos, date) in grid.dates().iter().enumerate() {
        if let Some(&slot) = by_date.get(date) {
            groups[slot].targets.push(pos);
        }
    }

    groups
}

fn slot_groups(ordered: &[(NaiveDateTime, usize)], grid: &TimeGrid) -> Vec<Group> {
    let mut by_slot: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for &(ts, row) in ordered {
        let Some(pos) = grid.slot_of(ts) else {
            continue;
        };
        let slot = *by_slot.entry(pos).or_insert_with(|| {
            groups.push(Group {
                rows: Vec::new(),
                targets: vec![pos],
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }

    groups
}

/// Per-date counts of a binary detection column: one row per observed date with the
/// time-of-day of the first window, the number of presences and the number of absences.
pub fn daily_presence_counts(
    raw: &DataFrame,
    timestamp_column: &str,
    presence_column: &str,
) -> Result<DataFrame> {
    let timestamps = read_timestamps(raw, TABLE, timestamp_column)?;
    let presence = require_column(raw, TABLE, presence_column)?.cast(&DataType::Float64)?;
    let presence = presence.f64()?;

    let mut ordered: Vec<(NaiveDateTime, Option<f64>)> = timestamps
        .iter()
        .zip(presence.into_iter())
        .filter_map(|(ts, value)| ts.map(|ts| (ts, value)))
        .collect();
    ordered.sort_by_key(|(ts, _)| *ts);

    let mut dates: Vec<NaiveDateTime> = Vec::new();
    let mut presences: Vec<f64> = Vec::new();
    let mut absences: Vec<f64> = Vec::new();

    for (ts, value) in ordered {
        if dates.last().map(NaiveDateTime::date) != Some(ts.date()) {
            dates.push(ts);
            presences.push(0.0);
            absences.push(0.0);
        }
        let last = presences.len() - 1;
        let hit = value.filter(|v| !v.is_nan()).unwrap_or(0.0);
        presences[last] += hit;
        absences[last] += 1.0 - hit;
    }

    let mut frame = grid_frame(&dates, Vec::new())?;
    frame.drop_in_place(TIMESTAMP_COLUMN)?;
    frame.rename(TIME_COLUMN, "first_time".into())?;
    frame.hstack_mut(&mut [
        Series::new("presences".into(), presences).into(),
        Series::new("absences".into(), absences).into(),
    ])?;

    Ok(frame)
}
