// Grid Collage Editor - Core Library

pub mod cell;
pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod export;
pub mod grid;
pub mod id_generator;
pub mod loader;
pub mod render;
pub mod selection;
pub mod title;
pub mod tracks;
pub mod ui;

// Re-export main types for convenience
pub use cell::{Cell, CellContent, CellId, CellKind, FontFamily, ImageRef, TextAlign, TextStyle};
pub use config::{EditorConfig, ExportConfig};
pub use editor::Editor;
pub use error::{ExportError, FileDecodeError, GridError, SnapshotError};
pub use event::{EditorEvent, EventType, InputEvent};
pub use export::{DocumentAssembler, ExportArtifact, ExportCoordinator, ExportFormat, PdfAssembler};
pub use grid::{CellCollection, Placement};
pub use loader::{FileReader, FsFileReader};
pub use render::{RasterRenderer, Scene, SceneCell, SnapshotSource};
pub use selection::{ContextMenu, MenuCommand, MenuEntry, SelectionController, SelectionState, Transition};
pub use title::TitleStyle;
pub use tracks::{Axis, TrackSizing, TrackTemplates, DEFAULT_TRACK_LENGTH};
pub use ui::GridCollageApp;
