//! Single selection and its context menu

use crate::cell::{Cell, CellId, FontFamily, TextAlign};
use serde::{Deserialize, Serialize};

/// Identity of one opened context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuId(u64);

/// Entries offered by a context menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuEntry {
    Remove,
    /// Font selector over the fixed font list
    Font { options: Vec<FontFamily>, current: FontFamily },
    /// Left/center/right alignment control
    Align { current: TextAlign },
}

/// Transient menu bound to the selected cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenu {
    pub id: MenuId,
    pub cell: CellId,
    pub entries: Vec<MenuEntry>,
}

impl ContextMenu {
    fn for_cell(id: MenuId, cell: &Cell) -> Self {
        let mut entries = vec![MenuEntry::Remove];
        if let Some(style) = cell.text_style() {
            entries.push(MenuEntry::Font {
                options: FontFamily::ALL.to_vec(),
                current: style.font,
            });
            entries.push(MenuEntry::Align {
                current: style.align,
            });
        }
        Self {
            id,
            cell: cell.id,
            entries,
        }
    }

    /// Whether the menu offers style editing
    pub fn offers_style(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, MenuEntry::Font { .. } | MenuEntry::Align { .. }))
    }

    /// Refresh the style entries after the bound cell changed
    pub(crate) fn sync_with(&mut self, cell: &Cell) {
        if let Some(style) = cell.text_style() {
            for entry in &mut self.entries {
                match entry {
                    MenuEntry::Font { current, .. } => *current = style.font,
                    MenuEntry::Align { current } => *current = style.align,
                    MenuEntry::Remove => {}
                }
            }
        }
    }
}

/// Commands issued from the context menu against the bound cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuCommand {
    Remove,
    SetFont(FontFamily),
    SetAlign(TextAlign),
    SetText(String),
}

/// Selection state. A menu is open exactly when a cell is selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected { cell: CellId, menu: ContextMenu },
}

/// Observable step of the selection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Deselected { cell: CellId, menu: MenuId },
    Selected { cell: CellId, menu: MenuId },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    next_menu: u64,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<CellId> {
        match &self.state {
            SelectionState::Selected { cell, .. } => Some(*cell),
            SelectionState::Idle => None,
        }
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        match &self.state {
            SelectionState::Selected { menu, .. } => Some(menu),
            SelectionState::Idle => None,
        }
    }

    pub(crate) fn menu_mut(&mut self) -> Option<&mut ContextMenu> {
        match &mut self.state {
            SelectionState::Selected { menu, .. } => Some(menu),
            SelectionState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SelectionState::Idle
    }

    /// Select `cell`, tearing down any previous selection and its menu first.
    ///
    /// Returns the transitions in the order they happened.
    pub fn select(&mut self, cell: &Cell) -> Vec<Transition> {
        let mut transitions: Vec<Transition> = self.deselect().into_iter().collect();

        let menu_id = MenuId(self.next_menu);
        self.next_menu += 1;
        self.state = SelectionState::Selected {
            cell: cell.id,
            menu: ContextMenu::for_cell(menu_id, cell),
        };
        log::debug!("selected cell {} (menu {:?})", cell.id, menu_id);

        transitions.push(Transition::Selected {
            cell: cell.id,
            menu: menu_id,
        });
        transitions
    }

    /// Return to `Idle`, closing the menu. No-op when nothing is selected.
    pub fn deselect(&mut self) -> Option<Transition> {
        match std::mem::take(&mut self.state) {
            SelectionState::Selected { cell, menu, .. } => {
                log::debug!("deselected cell {}", cell);
                Some(Transition::Deselected { cell, menu: menu.id })
            }
            SelectionState::Idle => None,
        }
    }

    /// Deselect only if `cell` is the selected one
    pub fn forget(&mut self, cell: CellId) -> Option<Transition> {
        if self.selected() == Some(cell) {
            self.deselect()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ImageRef;
    use pretty_assertions::assert_eq;

    fn text_cell(raw: u64) -> Cell {
        Cell::text(CellId::from_raw(raw))
    }

    fn image_cell(raw: u64) -> Cell {
        Cell::image(CellId::from_raw(raw), ImageRef::new("data:,"))
    }

    #[test]
    fn test_select_from_idle() {
        let mut selection = SelectionController::new();
        let cell = text_cell(0);

        let transitions = selection.select(&cell);
        assert_eq!(transitions.len(), 1);
        assert_eq!(selection.selected(), Some(cell.id));
        assert!(selection.menu().is_some());

        // The menu carries everything the selection needs to know about the cell
        match selection.state() {
            SelectionState::Selected { cell: id, menu } => {
                assert_eq!(*id, cell.id);
                assert_eq!(menu.cell, cell.id);
                assert!(menu.offers_style());
            }
            SelectionState::Idle => panic!("expected a selection"),
        }
    }

    #[test]
    fn test_reselect_tears_down_previous_menu_first() {
        let mut selection = SelectionController::new();
        let a = text_cell(0);
        let b = image_cell(1);

        selection.select(&a);
        let first_menu = selection.menu().map(|m| m.id).unwrap();

        let transitions = selection.select(&b);
        let second_menu = selection.menu().map(|m| m.id).unwrap();

        assert_ne!(first_menu, second_menu);
        assert_eq!(
            transitions,
            vec![
                Transition::Deselected { cell: a.id, menu: first_menu },
                Transition::Selected { cell: b.id, menu: second_menu },
            ]
        );
        assert_eq!(selection.selected(), Some(b.id));
    }

    #[test]
    fn test_menu_entries_depend_on_variant() {
        let mut selection = SelectionController::new();

        selection.select(&image_cell(0));
        assert_eq!(selection.menu().unwrap().entries, vec![MenuEntry::Remove]);

        selection.select(&text_cell(1));
        let menu = selection.menu().unwrap();
        assert!(menu.offers_style());
        assert_eq!(menu.entries[0], MenuEntry::Remove);
        assert_eq!(
            menu.entries[1],
            MenuEntry::Font {
                options: FontFamily::ALL.to_vec(),
                current: FontFamily::Arial
            }
        );
        assert_eq!(menu.entries[2], MenuEntry::Align { current: TextAlign::Left });
    }

    #[test]
    fn test_deselect_when_idle_is_noop() {
        let mut selection = SelectionController::new();
        assert_eq!(selection.deselect(), None);
        assert!(selection.is_idle());
    }

    #[test]
    fn test_forget_only_affects_selected_cell() {
        let mut selection = SelectionController::new();
        let a = text_cell(0);
        selection.select(&a);

        assert_eq!(selection.forget(CellId::from_raw(9)), None);
        assert_eq!(selection.selected(), Some(a.id));

        assert!(selection.forget(a.id).is_some());
        assert!(selection.is_idle());
        assert!(selection.menu().is_none());
    }
}
