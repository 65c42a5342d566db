//! Column virtualization window.
//!
//! Only the columns inside `[start, end)` are rendered; the window covers
//! the viewport plus `overscan` columns on each side, clamped to bounds.
//! Recomputation with identical inputs reports "unchanged" so downstream
//! render passes can be skipped.

/// Contiguous index range of columns to render. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Result of a window recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdate {
    pub range: ColumnRange,
    /// False when the inputs matched the previous recompute exactly;
    /// the caller must not re-render in that case.
    pub changed: bool,
}

/// Columns rendered after a reset, before the first real scroll arrives.
const RESET_SPAN: usize = 12;

/// Computes the visible column range from scroll offset and viewport size.
#[derive(Debug, Clone)]
pub struct ColumnWindow {
    column_width: f64,
    overscan: usize,
    column_count: usize,
    range: ColumnRange,
    last_inputs: Option<(f64, f64)>,
}

impl ColumnWindow {
    pub fn new(column_count: usize, column_width: f64, overscan: usize) -> Self {
        let mut window = Self {
            column_width,
            overscan,
            column_count,
            range: ColumnRange { start: 0, end: 0 },
            last_inputs: None,
        };
        window.reset();
        window
    }

    pub fn range(&self) -> ColumnRange {
        self.range
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// The underlying ordered column list changed identity (e.g. the
    /// planning horizon was extended). Window snaps back to the origin.
    pub fn set_column_count(&mut self, column_count: usize) {
        self.column_count = column_count;
        self.reset();
    }

    fn reset(&mut self) {
        self.range = ColumnRange {
            start: 0,
            end: self.column_count.min(2 * self.overscan + RESET_SPAN),
        };
        self.last_inputs = None;
    }

    /// Recompute the window. Idempotent: identical inputs return the same
    /// range with `changed == false`.
    pub fn recompute(&mut self, scroll_offset: f64, viewport_width: f64) -> WindowUpdate {
        if self.last_inputs == Some((scroll_offset, viewport_width)) {
            return WindowUpdate {
                range: self.range,
                changed: false,
            };
        }
        self.last_inputs = Some((scroll_offset, viewport_width));

        let range = self.compute(scroll_offset, viewport_width);
        let changed = range != self.range;
        self.range = range;
        WindowUpdate { range, changed }
    }

    fn compute(&self, scroll_offset: f64, viewport_width: f64) -> ColumnRange {
        if self.column_width <= 0.0 || self.column_count == 0 {
            return ColumnRange { start: 0, end: 0 };
        }

        let first_visible = (scroll_offset.max(0.0) / self.column_width).floor() as usize;
        let visible = (viewport_width.max(0.0) / self.column_width).ceil() as usize;

        let start = first_visible.saturating_sub(self.overscan);
        let end = self
            .column_count
            .min(start + visible + 2 * self.overscan);
        let start = start.min(end);

        ColumnRange { start, end }
    }
}
