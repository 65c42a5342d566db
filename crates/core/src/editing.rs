//! Cell editing state and numeric sanitation.
//!
//! At most one cell edits at a time. The edit buffer is raw text until
//! commit; sanitation happens exactly once, at commit, so intermediate
//! keystrokes ("1.", "") never produce errors.

use crate::cell::GridCell;

/// The in-progress edit, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EditingCell {
    pub cell: GridCell,
    pub raw_value: String,
}

impl EditingCell {
    pub fn new(cell: GridCell) -> Self {
        Self {
            cell,
            raw_value: String::new(),
        }
    }

    pub fn with_initial(cell: GridCell, initial: char) -> Self {
        Self {
            cell,
            raw_value: initial.to_string(),
        }
    }

    pub fn push(&mut self, ch: char) {
        self.raw_value.push(ch);
    }

    pub fn backspace(&mut self) {
        self.raw_value.pop();
    }
}

/// A committed edit, ready for the mutation path.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedEdit {
    pub cell: GridCell,
    pub hours: f64,
}

/// Clamp an edited value into `[0, max_hours]`.
///
/// Non-numeric input coerces to 0 rather than erroring: garbage typed into
/// an hours cell must never reach the write path (local sanitation is not
/// a user-visible failure).
pub fn sanitize_hours(raw: &str, max_hours: f64) -> f64 {
    let parsed = raw.trim().parse::<f64>().unwrap_or(0.0);
    if !parsed.is_finite() || parsed < 0.0 {
        return 0.0;
    }
    parsed.min(max_hours)
}
