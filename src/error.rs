//! Error types for the grid editor

use crate::cell::CellId;
use crate::tracks::Axis;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by grid, track and selection operations.
///
/// A failed operation never leaves partially-applied state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("invalid configuration: {field} is out of range, got {value}")]
    InvalidConfiguration { field: &'static str, value: i64 },

    #[error("{axis} track {index} does not exist ({count} tracks)")]
    TrackOutOfRange { axis: Axis, index: usize, count: usize },

    #[error("position {index} is out of range for {len} cells")]
    PositionOutOfRange { index: usize, len: usize },

    #[error("no cell is selected")]
    NoSelection,

    #[error("menu action is not available for cell {0}")]
    MenuActionUnavailable(CellId),

    #[error("cell not found: {0}")]
    UnknownCell(CellId),
}

impl GridError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<i64>) -> Self {
        GridError::InvalidConfiguration {
            field,
            value: value.into(),
        }
    }
}

/// Failure of the snapshot collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("could not decode image of cell {cell}: {reason}")]
    ImageDecode { cell: CellId, reason: String },

    #[error("snapshot rejected: {0}")]
    Rejected(String),
}

/// Errors raised while producing an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    ExportInProgress,

    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to assemble document: {0}")]
    Document(String),
}

/// A single file could not be turned into an image cell.
#[derive(Debug, Error)]
pub enum FileDecodeError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a supported image")]
    UnsupportedFormat { path: PathBuf },

    #[error("'{path}' could not be decoded: {source}")]
    Undecodable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),
}
