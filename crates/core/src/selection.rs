//! Selection and keyboard interaction for the scheduling grid.
//!
//! The controller tracks an anchor/focus rectangle over the *currently
//! visible* row and column orderings, owns the single editing cell, and
//! translates key presses into selection/edit transitions.
//!
//! Key invariants:
//! - Rectangle bounds are taken over ordering indices, not raw keys, so a
//!   selection stays meaningful across filtering and reordering.
//! - The anchor is fixed during a shift-extend gesture; only focus moves.
//! - At most one cell is editing; moves outside the visible bounds are no-ops.

use std::collections::HashSet;

use crate::cell::{GridCell, RowKey, WeekKey};
use crate::editing::{sanitize_hours, CommittedEdit, EditingCell};

/// Arrow-key movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Which surface currently owns shared keys (Escape).
///
/// The grid and the search widget never both claim Escape: the shell sets
/// the scope on focus change, and `escape()` consults it instead of
/// guessing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusScope {
    #[default]
    Grid,
    Search,
}

/// A raw key press, as mapped by the embedding shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyPress {
    Char(char),
    Backspace,
    Enter,
    Tab { shift: bool },
    Escape,
    Arrow { direction: Direction, shift: bool },
}

/// What a key press did, so the shell knows what to re-render or submit.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Ignored,
    SelectionMoved,
    EditStarted,
    EditUpdated,
    /// Edit committed (None when Enter/Tab arrived with no open edit).
    Committed(Option<CommittedEdit>),
    EditCancelled,
    SearchCleared,
}

/// Result of an Escape press under the current focus scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeOutcome {
    None,
    EditCancelled,
    SearchCleared,
}

/// Anchor/focus pair describing a rectangular selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRange {
    pub anchor: GridCell,
    pub focus: GridCell,
}

impl SelectionRange {
    pub fn single(cell: GridCell) -> Self {
        Self {
            anchor: cell.clone(),
            focus: cell,
        }
    }

    pub fn is_single(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Maximum hours in a week; default ceiling for edited values.
pub const DEFAULT_MAX_HOURS: f64 = 168.0;

/// Tracks selection and editing over the visible row/column orderings.
pub struct SelectionController {
    rows: Vec<RowKey>,
    cols: Vec<WeekKey>,
    selection: Option<SelectionRange>,
    editing: Option<EditingCell>,
    focus_scope: FocusScope,
    max_hours: f64,
}

impl SelectionController {
    pub fn new(rows: Vec<RowKey>, cols: Vec<WeekKey>) -> Self {
        Self {
            rows,
            cols,
            selection: None,
            editing: None,
            focus_scope: FocusScope::Grid,
            max_hours: DEFAULT_MAX_HOURS,
        }
    }

    pub fn with_max_hours(mut self, max_hours: f64) -> Self {
        self.max_hours = max_hours;
        self
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Replace the visible row ordering (filter/sort changed).
    ///
    /// The selection itself is untouched: rectangles are recomputed on
    /// demand against the new ordering. An open edit whose row vanished
    /// is cancelled, never committed.
    pub fn set_rows(&mut self, rows: Vec<RowKey>) {
        self.rows = rows;
        if let Some(edit) = &self.editing {
            if !self.rows.contains(&edit.cell.row) {
                self.editing = None;
            }
        }
    }

    /// Replace the visible column ordering (horizon change).
    pub fn set_cols(&mut self, cols: Vec<WeekKey>) {
        self.cols = cols;
        if let Some(edit) = &self.editing {
            if !self.cols.contains(&edit.cell.col) {
                self.editing = None;
            }
        }
    }

    pub fn rows(&self) -> &[RowKey] {
        &self.rows
    }

    pub fn cols(&self) -> &[WeekKey] {
        &self.cols
    }

    fn row_index(&self, key: &RowKey) -> Option<usize> {
        self.rows.iter().position(|r| r == key)
    }

    fn col_index(&self, key: &WeekKey) -> Option<usize> {
        self.cols.iter().position(|c| c == key)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> Option<&SelectionRange> {
        self.selection.as_ref()
    }

    /// Select a cell. With `extend`, keeps the anchor and moves focus
    /// (shift+click); otherwise collapses to a single cell.
    pub fn select(&mut self, cell: GridCell, extend: bool) {
        match (&mut self.selection, extend) {
            (Some(range), true) => range.focus = cell,
            _ => self.selection = Some(SelectionRange::single(cell)),
        }
    }

    /// Move focus one step. Rejected (no-op, returns false) at the bounds
    /// of the visible orderings, or when the focus cell was filtered out.
    pub fn move_focus(&mut self, direction: Direction, extend: bool) -> bool {
        let Some(range) = &self.selection else {
            return false;
        };
        let Some(row_idx) = self.row_index(&range.focus.row) else {
            return false;
        };
        let Some(col_idx) = self.col_index(&range.focus.col) else {
            return false;
        };

        let (new_row, new_col) = match direction {
            Direction::Up => {
                if row_idx == 0 {
                    return false;
                }
                (row_idx - 1, col_idx)
            }
            Direction::Down => {
                if row_idx + 1 >= self.rows.len() {
                    return false;
                }
                (row_idx + 1, col_idx)
            }
            Direction::Left => {
                if col_idx == 0 {
                    return false;
                }
                (row_idx, col_idx - 1)
            }
            Direction::Right => {
                if col_idx + 1 >= self.cols.len() {
                    return false;
                }
                (row_idx, col_idx + 1)
            }
        };

        let cell = GridCell {
            row: self.rows[new_row].clone(),
            col: self.cols[new_col].clone(),
        };
        self.select(cell, extend);
        true
    }

    /// The selected cells: the axis-aligned rectangle between anchor and
    /// focus, projected onto the current orderings. Empty when either end
    /// has been filtered out.
    pub fn selected_cells(&self) -> HashSet<GridCell> {
        let mut cells = HashSet::new();
        let Some(range) = &self.selection else {
            return cells;
        };

        let (Some(ar), Some(ac), Some(fr), Some(fc)) = (
            self.row_index(&range.anchor.row),
            self.col_index(&range.anchor.col),
            self.row_index(&range.focus.row),
            self.col_index(&range.focus.col),
        ) else {
            return cells;
        };

        for r in ar.min(fr)..=ar.max(fr) {
            for c in ac.min(fc)..=ac.max(fc) {
                cells.insert(GridCell {
                    row: self.rows[r].clone(),
                    col: self.cols[c].clone(),
                });
            }
        }
        cells
    }

    pub fn is_single_cell(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| s.is_single())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn editing(&self) -> Option<&EditingCell> {
        self.editing.as_ref()
    }

    /// Open an edit on a cell, optionally seeded with a typed character.
    /// Selection collapses to the edited cell.
    pub fn start_edit(&mut self, cell: GridCell, initial: Option<char>) {
        self.selection = Some(SelectionRange::single(cell.clone()));
        self.editing = Some(match initial {
            Some(ch) => EditingCell::with_initial(cell, ch),
            None => EditingCell::new(cell),
        });
    }

    /// Commit the open edit, sanitizing the buffer into hours.
    pub fn commit_edit(&mut self) -> Option<CommittedEdit> {
        let edit = self.editing.take()?;
        let hours = sanitize_hours(&edit.raw_value, self.max_hours);
        Some(CommittedEdit {
            cell: edit.cell,
            hours,
        })
    }

    /// Discard the open edit without touching grid state.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    // =========================================================================
    // Focus scope and keys
    // =========================================================================

    pub fn focus_scope(&self) -> FocusScope {
        self.focus_scope
    }

    pub fn set_focus_scope(&mut self, scope: FocusScope) {
        self.focus_scope = scope;
    }

    /// Escape under explicit scope ownership: search clears its
    /// composition, the grid cancels its edit. Never both.
    pub fn escape(&mut self) -> EscapeOutcome {
        match self.focus_scope {
            FocusScope::Search => EscapeOutcome::SearchCleared,
            FocusScope::Grid => {
                if self.editing.is_some() {
                    self.cancel_edit();
                    EscapeOutcome::EditCancelled
                } else {
                    EscapeOutcome::None
                }
            }
        }
    }

    /// Translate a key press into a selection/edit transition.
    pub fn handle_key(&mut self, key: KeyPress) -> KeyOutcome {
        match key {
            KeyPress::Char(ch) => self.handle_char(ch),
            KeyPress::Backspace => {
                if let Some(edit) = &mut self.editing {
                    edit.backspace();
                    KeyOutcome::EditUpdated
                } else {
                    KeyOutcome::Ignored
                }
            }
            KeyPress::Enter => self.commit_and_advance(false),
            KeyPress::Tab { shift } => self.commit_and_advance(shift),
            KeyPress::Escape => match self.escape() {
                EscapeOutcome::EditCancelled => KeyOutcome::EditCancelled,
                EscapeOutcome::SearchCleared => KeyOutcome::SearchCleared,
                EscapeOutcome::None => KeyOutcome::Ignored,
            },
            KeyPress::Arrow { direction, shift } => {
                if self.editing.is_some() {
                    return KeyOutcome::Ignored;
                }
                if self.move_focus(direction, shift) {
                    KeyOutcome::SelectionMoved
                } else {
                    KeyOutcome::Ignored
                }
            }
        }
    }

    /// A digit or '.' on a single selected, non-editing cell starts an
    /// edit seeded with that character; while editing, characters append.
    fn handle_char(&mut self, ch: char) -> KeyOutcome {
        if let Some(edit) = &mut self.editing {
            edit.push(ch);
            return KeyOutcome::EditUpdated;
        }
        if !(ch.is_ascii_digit() || ch == '.') {
            return KeyOutcome::Ignored;
        }
        if !self.is_single_cell() {
            return KeyOutcome::Ignored;
        }
        let cell = self.selection.as_ref().map(|s| s.focus.clone());
        match cell {
            Some(cell) => {
                self.start_edit(cell, Some(ch));
                KeyOutcome::EditStarted
            }
            None => KeyOutcome::Ignored,
        }
    }

    /// Enter/Tab: commit the edit (if any) and step one column. At the
    /// boundary column the commit still happens but focus stays put.
    fn commit_and_advance(&mut self, reverse: bool) -> KeyOutcome {
        let committed = self.commit_edit();
        let direction = if reverse {
            Direction::Left
        } else {
            Direction::Right
        };
        self.move_focus(direction, false);
        KeyOutcome::Committed(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SelectionController {
        let rows = vec![
            RowKey::new("alice"),
            RowKey::new("bob"),
            RowKey::new("carol"),
        ];
        let cols = vec![
            WeekKey::new("2026-W35"),
            WeekKey::new("2026-W36"),
            WeekKey::new("2026-W37"),
            WeekKey::new("2026-W38"),
        ];
        SelectionController::new(rows, cols)
    }

    #[test]
    fn test_select_collapses_to_single() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);

        assert!(ctl.is_single_cell());
        assert_eq!(ctl.selected_cells().len(), 1);
    }

    #[test]
    fn test_extend_keeps_anchor_and_builds_rectangle() {
        let mut ctl = controller();
        ctl.select(GridCell::new("alice", "2026-W35"), false);
        ctl.select(GridCell::new("carol", "2026-W36"), true);

        let cells = ctl.selected_cells();
        assert_eq!(cells.len(), 6); // 3 rows x 2 cols
        assert!(cells.contains(&GridCell::new("bob", "2026-W35")));
        assert_eq!(ctl.selection().unwrap().anchor, GridCell::new("alice", "2026-W35"));
    }

    #[test]
    fn test_rectangle_path_independent() {
        // Same anchor + final focus must yield the same rectangle no
        // matter the intermediate path.
        let mut a = controller();
        a.select(GridCell::new("alice", "2026-W35"), false);
        a.move_focus(Direction::Down, true);
        a.move_focus(Direction::Right, true);
        a.move_focus(Direction::Down, true);

        let mut b = controller();
        b.select(GridCell::new("alice", "2026-W35"), false);
        b.move_focus(Direction::Right, true);
        b.move_focus(Direction::Down, true);
        b.move_focus(Direction::Down, true);

        assert_eq!(a.selected_cells(), b.selected_cells());
        assert_eq!(a.selected_cells().len(), 6);
    }

    #[test]
    fn test_move_focus_rejected_at_bounds() {
        let mut ctl = controller();
        ctl.select(GridCell::new("alice", "2026-W35"), false);

        assert!(!ctl.move_focus(Direction::Up, false));
        assert!(!ctl.move_focus(Direction::Left, false));
        assert_eq!(
            ctl.selection().unwrap().focus,
            GridCell::new("alice", "2026-W35")
        );
    }

    #[test]
    fn test_rectangle_follows_reordering() {
        let mut ctl = controller();
        ctl.select(GridCell::new("alice", "2026-W35"), false);
        ctl.select(GridCell::new("bob", "2026-W35"), true);
        assert_eq!(ctl.selected_cells().len(), 2);

        // Filter moves carol between alice and bob: rectangle over the
        // new ordering now spans three rows.
        ctl.set_rows(vec![
            RowKey::new("alice"),
            RowKey::new("carol"),
            RowKey::new("bob"),
        ]);
        assert_eq!(ctl.selected_cells().len(), 3);
    }

    #[test]
    fn test_filtered_out_endpoint_yields_empty_set() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.set_rows(vec![RowKey::new("alice"), RowKey::new("carol")]);

        assert!(ctl.selected_cells().is_empty());
        assert!(!ctl.move_focus(Direction::Down, false));
    }

    #[test]
    fn test_typing_digit_starts_edit() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);

        assert_eq!(ctl.handle_key(KeyPress::Char('4')), KeyOutcome::EditStarted);
        assert_eq!(ctl.editing().unwrap().raw_value, "4");

        assert_eq!(ctl.handle_key(KeyPress::Char('2')), KeyOutcome::EditUpdated);
        assert_eq!(ctl.editing().unwrap().raw_value, "42");
    }

    #[test]
    fn test_typing_letter_does_not_start_edit() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);

        assert_eq!(ctl.handle_key(KeyPress::Char('x')), KeyOutcome::Ignored);
        assert!(ctl.editing().is_none());
    }

    #[test]
    fn test_multi_cell_selection_blocks_edit_start() {
        let mut ctl = controller();
        ctl.select(GridCell::new("alice", "2026-W35"), false);
        ctl.select(GridCell::new("bob", "2026-W36"), true);

        assert_eq!(ctl.handle_key(KeyPress::Char('4')), KeyOutcome::Ignored);
        assert!(ctl.editing().is_none());
    }

    #[test]
    fn test_enter_commits_and_moves_right() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.handle_key(KeyPress::Char('8'));

        let outcome = ctl.handle_key(KeyPress::Enter);
        match outcome {
            KeyOutcome::Committed(Some(edit)) => {
                assert_eq!(edit.cell, GridCell::new("bob", "2026-W36"));
                assert_eq!(edit.hours, 8.0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            ctl.selection().unwrap().focus,
            GridCell::new("bob", "2026-W37")
        );
    }

    #[test]
    fn test_shift_tab_moves_left() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.handle_key(KeyPress::Tab { shift: true });

        assert_eq!(
            ctl.selection().unwrap().focus,
            GridCell::new("bob", "2026-W35")
        );
    }

    #[test]
    fn test_commit_at_last_column_stays_put() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W38"), false);
        ctl.handle_key(KeyPress::Char('3'));
        ctl.handle_key(KeyPress::Enter);

        assert_eq!(
            ctl.selection().unwrap().focus,
            GridCell::new("bob", "2026-W38")
        );
    }

    #[test]
    fn test_escape_cancels_edit_in_grid_scope() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.handle_key(KeyPress::Char('9'));

        assert_eq!(ctl.escape(), EscapeOutcome::EditCancelled);
        assert!(ctl.editing().is_none());
    }

    #[test]
    fn test_escape_owned_by_search_scope() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.handle_key(KeyPress::Char('9'));
        ctl.set_focus_scope(FocusScope::Search);

        // Search owns Escape: the grid edit survives.
        assert_eq!(ctl.escape(), EscapeOutcome::SearchCleared);
        assert!(ctl.editing().is_some());
    }

    #[test]
    fn test_commit_sanitizes_value() {
        let mut ctl = controller();
        ctl.select(GridCell::new("bob", "2026-W36"), false);
        ctl.start_edit(GridCell::new("bob", "2026-W36"), None);
        ctl.editing.as_mut().unwrap().raw_value = "999".into();

        let edit = ctl.commit_edit().unwrap();
        assert_eq!(edit.hours, DEFAULT_MAX_HOURS);
    }

    #[test]
    fn test_reordering_cancels_orphaned_edit() {
        let mut ctl = controller();
        ctl.start_edit(GridCell::new("bob", "2026-W36"), Some('4'));
        ctl.set_rows(vec![RowKey::new("alice")]);

        assert!(ctl.editing().is_none());
    }
}
