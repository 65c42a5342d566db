//! Cell identity for the scheduling grid.
//!
//! Rows are people (or other assignable entities), columns are weeks.
//! Cells are addressed by key, not by index: the visible ordering changes
//! under filtering and reordering, and a cell must keep meaning the same
//! (person, week) pair throughout.

use serde::{Deserialize, Serialize};

/// Key of a person/entity row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(pub String);

/// Key of a week column (e.g. "2026-W35").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekKey(pub String);

impl RowKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl WeekKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for WeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One editable unit of the grid: a (person, week) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: RowKey,
    pub col: WeekKey,
}

impl GridCell {
    pub fn new(row: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            row: RowKey::new(row),
            col: WeekKey::new(col),
        }
    }
}
