//! Column and row track sizing

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Length given to tracks that did not exist before a count change
pub const DEFAULT_TRACK_LENGTH: u32 = 150;

/// Longest accepted track, in pixels
pub const MAX_TRACK_LENGTH: u32 = 4096;

/// Largest accepted column count
pub const MAX_COLUMN_COUNT: usize = 64;

/// Widest accepted gap between tracks, in pixels
pub const MAX_CELL_SPACING: u32 = 512;

/// Grid axis a track belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Column,
    Row,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Column => f.write_str("column"),
            Axis::Row => f.write_str("row"),
        }
    }
}

/// Number of rows needed to hold `cell_count` cells, never less than one
pub fn row_count_for(cell_count: usize, column_count: NonZeroUsize) -> usize {
    cell_count.div_ceil(column_count.get()).max(1)
}

/// Explicit pixel lengths of every column and row track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSizing {
    column_widths: Vec<u32>,
    row_heights: Vec<u32>,
    default_length: u32,
}

impl TrackSizing {
    /// Create a model with `column_count` columns and a single row
    pub fn new(column_count: usize, default_length: u32) -> Result<Self, GridError> {
        let default_length = bounded_length(default_length, "default track length")?;
        let column_count = non_zero_columns(column_count)?;

        Ok(Self {
            column_widths: vec![default_length; column_count.get()],
            row_heights: vec![default_length],
            default_length,
        })
    }

    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    pub fn default_length(&self) -> u32 {
        self.default_length
    }

    /// Regenerate the column widths to length `n`.
    ///
    /// Widths at indices that survive are kept, new columns get the default
    /// length. Rows are not touched; callers recompute them afterwards.
    pub fn set_column_count(&mut self, n: usize) -> Result<(), GridError> {
        let n = non_zero_columns(n)?;
        self.column_widths.resize(n.get(), self.default_length);
        log::debug!("column count set to {}", n);
        Ok(())
    }

    /// Resize the row heights to fit `cell_count` cells with the current
    /// column count, returning the new row count.
    pub fn recompute_row_count(&mut self, cell_count: usize) -> usize {
        let columns = NonZeroUsize::new(self.column_widths.len()).unwrap_or(NonZeroUsize::MIN);
        let rows = row_count_for(cell_count, columns);
        if rows != self.row_heights.len() {
            log::debug!("row count {} -> {}", self.row_heights.len(), rows);
        }
        self.row_heights.resize(rows, self.default_length);
        rows
    }

    /// Overwrite the length of one track
    pub fn set_track_length(&mut self, axis: Axis, index: usize, length: u32) -> Result<(), GridError> {
        let length = bounded_length(length, "track length")?;
        let tracks = match axis {
            Axis::Column => &mut self.column_widths,
            Axis::Row => &mut self.row_heights,
        };
        let count = tracks.len();
        let track = tracks
            .get_mut(index)
            .ok_or(GridError::TrackOutOfRange { axis, index, count })?;
        *track = length;
        Ok(())
    }

    pub fn track_length(&self, axis: Axis, index: usize) -> Option<u32> {
        match axis {
            Axis::Column => self.column_widths.get(index).copied(),
            Axis::Row => self.row_heights.get(index).copied(),
        }
    }

    /// Produce the track templates for the rendering side
    pub fn materialize(&self) -> TrackTemplates {
        TrackTemplates {
            columns: self.column_widths.clone(),
            rows: self.row_heights.clone(),
        }
    }
}

fn non_zero_columns(n: usize) -> Result<NonZeroUsize, GridError> {
    NonZeroUsize::new(n)
        .filter(|n| n.get() <= MAX_COLUMN_COUNT)
        .ok_or_else(|| GridError::invalid("column count", i64::try_from(n).unwrap_or(i64::MAX)))
}

fn bounded_length(length: u32, field: &'static str) -> Result<u32, GridError> {
    if length == 0 || length > MAX_TRACK_LENGTH {
        return Err(GridError::invalid(field, length));
    }
    Ok(length)
}

/// Materialized pixel lengths of both axes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTemplates {
    pub columns: Vec<u32>,
    pub rows: Vec<u32>,
}

impl TrackTemplates {
    pub fn tracks(&self, axis: Axis) -> &[u32] {
        match axis {
            Axis::Column => &self.columns,
            Axis::Row => &self.rows,
        }
    }

    /// CSS-style template such as `"150px 200px"`
    pub fn template(&self, axis: Axis) -> String {
        self.tracks(axis)
            .iter()
            .map(|len| format!("{}px", len))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start offset of a track, counting the gap between tracks.
    /// Saturates at `u32::MAX`.
    pub fn offset(&self, axis: Axis, index: usize, gap: u32) -> u32 {
        self.tracks(axis)
            .iter()
            .take(index)
            .fold(0u32, |acc, len| acc.saturating_add(*len).saturating_add(gap))
    }

    /// Total length of an axis including gaps. Saturates at `u32::MAX`.
    pub fn extent(&self, axis: Axis, gap: u32) -> u32 {
        let tracks = self.tracks(axis);
        let lengths = tracks.iter().fold(0u32, |acc, len| acc.saturating_add(*len));
        let gaps = u32::try_from(tracks.len().saturating_sub(1))
            .unwrap_or(u32::MAX)
            .saturating_mul(gap);
        lengths.saturating_add(gaps)
    }
}
