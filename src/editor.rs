use crate::cell::{Cell, CellId, FontFamily, ImageRef, TextAlign};
use crate::config::EditorConfig;
use crate::error::{FileDecodeError, GridError};
use crate::event::{EditorEvent, EventType, InputEvent};
use crate::grid::{CellCollection, Placement};
use crate::render::{Scene, SceneCell};
use crate::selection::{MenuCommand, SelectionController, Transition};
use crate::title::TitleStyle;
use crate::tracks::{Axis, TrackSizing, MAX_CELL_SPACING};

/// Number of entries the event log keeps
pub const EVENT_LOG_CAPACITY: usize = 512;

/// One editing session: owns the cells, tracks, selection and title, and is
/// the only way to mutate them.
#[derive(Debug, Clone)]
pub struct Editor {
    cells: CellCollection,
    tracks: TrackSizing,
    selection: SelectionController,
    title: TitleStyle,
    gap_px: u32,

    /// Recent changes, oldest first, bounded by `EVENT_LOG_CAPACITY`
    events: Vec<EditorEvent>,
}

impl Editor {
    /// Create an editor initialized from the configured control values
    pub fn new(config: &EditorConfig) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            cells: CellCollection::new(),
            tracks: TrackSizing::new(config.column_count, config.default_track_length)?,
            selection: SelectionController::new(),
            title: config.title.clone(),
            gap_px: config.cell_spacing,
            events: Vec::new(),
        })
    }

    // ========== Accessors ==========

    pub fn cells(&self) -> &CellCollection {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn tracks(&self) -> &TrackSizing {
        &self.tracks
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn selected(&self) -> Option<CellId> {
        self.selection.selected()
    }

    pub fn title(&self) -> &TitleStyle {
        self.title.current_style()
    }

    pub fn gap_px(&self) -> u32 {
        self.gap_px
    }

    pub fn column_count(&self) -> usize {
        self.tracks.column_count()
    }

    pub fn row_count(&self) -> usize {
        self.tracks.row_count()
    }

    pub fn placement(&self, id: CellId) -> Option<Placement> {
        self.cells.placement(id, self.tracks.column_count())
    }

    /// Logged events, oldest first
    pub fn events(&self) -> &[EditorEvent] {
        &self.events
    }

    // ========== Cells ==========

    pub fn append_image_cell(&mut self, image: ImageRef) -> CellId {
        let id = self.cells.append_image(image);
        self.after_append(id);
        id
    }

    pub fn append_text_cell(&mut self) -> CellId {
        let id = self.cells.append_text();
        self.after_append(id);
        id
    }

    /// Append one image cell per successfully decoded file, in input order.
    /// Failed decodes are skipped.
    pub fn append_decoded(
        &mut self,
        results: impl IntoIterator<Item = Result<ImageRef, FileDecodeError>>,
    ) -> Vec<CellId> {
        let mut added = Vec::new();
        for result in results {
            match result {
                Ok(image) => added.push(self.append_image_cell(image)),
                Err(e) => log::warn!("skipping image: {}", e),
            }
        }
        added
    }

    /// Remove a cell. Unknown identities are ignored; removing the selected
    /// cell returns the selection to idle.
    pub fn remove_cell(&mut self, id: CellId) -> bool {
        if self.cells.remove(id).is_none() {
            log::debug!("remove ignored, cell {} not present", id);
            return false;
        }

        if let Some(transition) = self.selection.forget(id) {
            self.log_transition(transition);
        }
        self.log_event(EventType::CellRemoved { id });
        self.recompute_rows();
        true
    }

    /// Apply a completed reorder from the drag-and-drop layer
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), GridError> {
        self.cells.move_cell(from, to)?;
        if from != to {
            let ids = self.cells.ids();
            self.log_event(EventType::CellMoved { id: ids[to], from, to });
        }
        Ok(())
    }

    pub fn set_cell_text(&mut self, id: CellId, text: impl Into<String>) -> Result<(), GridError> {
        let cell = self.cells.get_mut(id).ok_or(GridError::UnknownCell(id))?;
        if !cell.set_text(text) {
            return Err(GridError::MenuActionUnavailable(id));
        }
        self.log_event(EventType::CellTextChanged { id });
        Ok(())
    }

    // ========== Tracks ==========

    pub fn set_column_count(&mut self, columns: usize) -> Result<(), GridError> {
        self.tracks.set_column_count(columns)?;
        self.log_event(EventType::ColumnCountChanged { columns });
        self.recompute_rows();
        Ok(())
    }

    pub fn set_track_length(&mut self, axis: Axis, index: usize, length: u32) -> Result<(), GridError> {
        self.tracks.set_track_length(axis, index, length)?;
        self.log_event(EventType::TrackResized { axis, index, length });
        Ok(())
    }

    pub fn set_cell_spacing(&mut self, gap_px: u32) -> Result<(), GridError> {
        if gap_px > MAX_CELL_SPACING {
            return Err(GridError::invalid("cell spacing", gap_px));
        }
        self.gap_px = gap_px;
        self.log_event(EventType::CellSpacingChanged { gap_px });
        Ok(())
    }

    fn after_append(&mut self, id: CellId) {
        if let Some(cell) = self.cells.get(id) {
            let kind = cell.kind();
            self.log_event(EventType::CellAppended { id, kind });
        }
        self.recompute_rows();
    }

    fn recompute_rows(&mut self) {
        let before = self.tracks.row_count();
        let rows = self.tracks.recompute_row_count(self.cells.len());
        if rows != before {
            self.log_event(EventType::RowCountChanged { rows });
        }
    }

    // ========== Selection & Context Menu ==========

    /// Select a clicked cell, replacing any previous selection
    pub fn click_cell(&mut self, id: CellId) -> Result<(), GridError> {
        let cell = self.cells.get(id).ok_or(GridError::UnknownCell(id))?;
        let transitions = self.selection.select(cell);
        for transition in transitions {
            self.log_transition(transition);
        }
        Ok(())
    }

    /// A click that hit neither a cell nor the open menu
    pub fn click_outside(&mut self) {
        self.deselect();
    }

    /// Clear the selection and close the menu
    pub fn deselect(&mut self) {
        if let Some(transition) = self.selection.deselect() {
            self.log_transition(transition);
        }
    }

    /// Run a context-menu command against the selected cell
    pub fn apply_menu_command(&mut self, command: MenuCommand) -> Result<(), GridError> {
        let id = self.selection.selected().ok_or(GridError::NoSelection)?;

        match command {
            MenuCommand::Remove => {
                self.remove_cell(id);
                // Removal always ends in Idle, even if the cell vanished already
                self.deselect();
                return Ok(());
            }
            MenuCommand::SetText(text) => return self.set_cell_text(id, text),
            MenuCommand::SetFont(_) | MenuCommand::SetAlign(_) => {}
        }

        let cell = self.cells.get_mut(id).ok_or(GridError::UnknownCell(id))?;
        let style = cell
            .text_style_mut()
            .ok_or(GridError::MenuActionUnavailable(id))?;
        match command {
            MenuCommand::SetFont(font) => style.font = font,
            MenuCommand::SetAlign(align) => style.align = align,
            MenuCommand::Remove | MenuCommand::SetText(_) => {}
        }
        let style = *style;

        if let Some(menu) = self.selection.menu_mut() {
            menu.sync_with(cell);
        }
        self.log_event(EventType::CellStyleChanged { id, style });
        Ok(())
    }

    // ========== Title ==========

    pub fn set_title_text(&mut self, text: impl Into<String>) {
        self.title.set_text(text);
        self.log_event(EventType::TitleChanged);
    }

    pub fn set_title_font(&mut self, font: FontFamily) {
        self.title.set_font(font);
        self.log_event(EventType::TitleChanged);
    }

    pub fn set_title_size(&mut self, size_px: u32) -> Result<(), GridError> {
        self.title.set_size(size_px)?;
        self.log_event(EventType::TitleChanged);
        Ok(())
    }

    pub fn set_title_align(&mut self, align: TextAlign) {
        self.title.set_align(align);
        self.log_event(EventType::TitleChanged);
    }

    // ========== Input dispatch ==========

    /// Dispatch one input event to the matching model operation
    pub fn handle(&mut self, input: InputEvent) -> Result<(), GridError> {
        match input {
            InputEvent::CellClicked(id) => self.click_cell(id),
            InputEvent::ClickedOutside => {
                self.click_outside();
                Ok(())
            }
            InputEvent::ReorderCompleted { from, to } => self.move_cell(from, to),
            InputEvent::AddTextCell => {
                self.append_text_cell();
                Ok(())
            }
            InputEvent::ColumnCountChanged(value) => {
                let columns = positive(value, "column count")?;
                self.set_column_count(columns as usize)
            }
            InputEvent::TrackLengthChanged { axis, index, value } => {
                let length = positive(value, "track length")?;
                self.set_track_length(axis, index, length)
            }
            InputEvent::CellSpacingChanged(value) => {
                let gap = u32::try_from(value).map_err(|_| GridError::invalid("cell spacing", value))?;
                self.set_cell_spacing(gap)
            }
            InputEvent::TitleTextChanged(text) => {
                self.set_title_text(text);
                Ok(())
            }
            InputEvent::TitleFontChanged(font) => {
                self.set_title_font(font);
                Ok(())
            }
            InputEvent::TitleSizeChanged(value) => {
                let size = positive(value, "title font size")?;
                self.set_title_size(size)
            }
            InputEvent::TitleAlignChanged(align) => {
                self.set_title_align(align);
                Ok(())
            }
            InputEvent::Menu(command) => self.apply_menu_command(command),
        }
    }

    // ========== Scene ==========

    /// Everything the rendering side needs to draw the current state
    pub fn scene(&self) -> Scene {
        let columns = self.tracks.column_count();
        let selected = self.selection.selected();
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| SceneCell {
                id: cell.id,
                placement: Placement::of_index(index, columns),
                content: cell.content.clone(),
                selected: selected == Some(cell.id),
            })
            .collect();

        Scene {
            cells,
            tracks: self.tracks.materialize(),
            gap_px: self.gap_px,
            title: self.title.clone(),
            menu: self.selection.menu().cloned(),
        }
    }

    fn log_transition(&mut self, transition: Transition) {
        let event = match transition {
            Transition::Selected { cell, menu } => EventType::CellSelected { id: cell, menu },
            Transition::Deselected { cell, menu } => EventType::CellDeselected { id: cell, menu },
        };
        self.log_event(event);
    }

    /// Record a change. Repeated edits of the same control collapse into
    /// the latest entry, and the oldest entries fall off past capacity.
    fn log_event(&mut self, event: EventType) {
        let event = EditorEvent::new(event);
        match self.events.last_mut() {
            Some(last) if event.event.supersedes(&last.event) => *last = event,
            _ => self.events.push(event),
        }
        if self.events.len() > EVENT_LOG_CAPACITY {
            let excess = self.events.len() - EVENT_LOG_CAPACITY;
            self.events.drain(..excess);
        }
    }
}

/// Validate a raw control value as a positive `u32`
fn positive(value: i64, field: &'static str) -> Result<u32, GridError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or(GridError::InvalidConfiguration { field, value })
}
