use crate::cell::{CellId, CellKind, FontFamily, TextAlign, TextStyle};
use crate::selection::{MenuCommand, MenuId};
use crate::tracks::Axis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input reported by the presentation layer and the editor controls.
///
/// Numeric fields carry the raw control value so that negative input reaches
/// validation instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    CellClicked(CellId),
    /// Click that hit neither a cell nor the open menu
    ClickedOutside,
    /// Drag-and-drop reorder finished
    ReorderCompleted { from: usize, to: usize },
    AddTextCell,
    ColumnCountChanged(i64),
    TrackLengthChanged { axis: Axis, index: usize, value: i64 },
    CellSpacingChanged(i64),
    TitleTextChanged(String),
    TitleFontChanged(FontFamily),
    TitleSizeChanged(i64),
    TitleAlignChanged(TextAlign),
    Menu(MenuCommand),
}

/// A logged editor event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl EditorEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Changes applied to the editor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    CellAppended { id: CellId, kind: CellKind },

    CellRemoved { id: CellId },

    CellMoved { id: CellId, from: usize, to: usize },

    CellTextChanged { id: CellId },

    CellStyleChanged { id: CellId, style: TextStyle },

    CellSelected { id: CellId, menu: MenuId },

    CellDeselected { id: CellId, menu: MenuId },

    ColumnCountChanged { columns: usize },

    RowCountChanged { rows: usize },

    TrackResized { axis: Axis, index: usize, length: u32 },

    CellSpacingChanged { gap_px: u32 },

    TitleChanged,
}

impl EventType {
    /// Whether this event makes `previous` redundant, as with successive
    /// keystrokes or drag frames on the same control
    pub fn supersedes(&self, previous: &EventType) -> bool {
        match (self, previous) {
            (EventType::TitleChanged, EventType::TitleChanged) => true,
            (EventType::CellSpacingChanged { .. }, EventType::CellSpacingChanged { .. }) => true,
            (EventType::ColumnCountChanged { .. }, EventType::ColumnCountChanged { .. }) => true,
            (EventType::CellTextChanged { id }, EventType::CellTextChanged { id: prev }) => id == prev,
            (
                EventType::TrackResized { axis, index, .. },
                EventType::TrackResized { axis: prev_axis, index: prev_index, .. },
            ) => axis == prev_axis && index == prev_index,
            _ => false,
        }
    }
}
