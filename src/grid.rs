use crate::cell::{Cell, CellId, ImageRef};
use crate::error::GridError;
use crate::id_generator::IdGenerator;
use serde::{Deserialize, Serialize};

/// Row and column a cell occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub row: usize,
    pub column: usize,
}

impl Placement {
    /// Placement of the cell at `index` in a grid with `columns` columns
    pub fn of_index(index: usize, columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            row: index / columns,
            column: index % columns,
        }
    }
}

/// Ordered cells of the grid. Position in the sequence is the only source of
/// grid placement.
#[derive(Debug, Clone, Default)]
pub struct CellCollection {
    /// Cells in reading order
    cells: Vec<Cell>,

    /// Identity allocator, shared by every cell ever created here
    ids: IdGenerator,
}

impl CellCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Cell CRUD Operations ==========

    /// Append an image cell at the end
    pub fn append_image(&mut self, image: ImageRef) -> CellId {
        let id = self.ids.next();
        self.cells.push(Cell::image(id, image));
        id
    }

    /// Append an empty text cell at the end
    pub fn append_text(&mut self) -> CellId {
        let id = self.ids.next();
        self.cells.push(Cell::text(id));
        id
    }

    /// Remove the cell with the given identity. Missing identities are a no-op.
    pub fn remove(&mut self, id: CellId) -> Option<Cell> {
        let index = self.position(id)?;
        Some(self.cells.remove(index))
    }

    /// Relocate the cell at `from` to `to`, shifting the cells in between
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), GridError> {
        let len = self.cells.len();
        for index in [from, to] {
            if index >= len {
                return Err(GridError::PositionOutOfRange { index, len });
            }
        }

        if from != to {
            let cell = self.cells.remove(from);
            self.cells.insert(to, cell);
        }
        Ok(())
    }

    /// Get a cell by ID
    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    /// Get a mutable reference to a cell by ID
    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.id == id)
    }

    /// Current index of a cell
    pub fn position(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id == id)
    }

    /// Row and column of a cell for a grid with `columns` columns
    pub fn placement(&self, id: CellId, columns: usize) -> Option<Placement> {
        self.position(id)
            .map(|index| Placement::of_index(index, columns))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Identities in reading order
    pub fn ids(&self) -> Vec<CellId> {
        self.cells.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
