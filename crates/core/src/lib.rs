//! `weekboard-core` — grid interaction primitives for the scheduling grid.
//!
//! Pure state crate: no IO, no threads. The embedding shell feeds it input
//! (keys, pointer cells, scroll offsets) and reads back selection, edit,
//! and render-window state.

pub mod cell;
pub mod editing;
pub mod scroll;
pub mod selection;
pub mod virtual_window;

pub use cell::{GridCell, RowKey, WeekKey};
pub use editing::{sanitize_hours, CommittedEdit, EditingCell};
pub use scroll::ScrollMirror;
pub use selection::{
    Direction, EscapeOutcome, FocusScope, KeyOutcome, KeyPress, SelectionController,
    SelectionRange, DEFAULT_MAX_HOURS,
};
pub use virtual_window::{ColumnRange, ColumnWindow, WindowUpdate};
