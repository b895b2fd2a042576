//! Grid addressing: rows and columns of bytes over the viewport base.
//!
//! Hit testing works in *cells*, the host's already-resolved horizontal
//! positions. A row is laid out as `3 * columns` hex cells (high nibble,
//! low nibble, trailing gap per byte), one separator cell, then `columns`
//! text cells.

use crate::caret::Pane;

/// Widest row the column fit will ever produce.
pub const MAX_COLUMNS: usize = 64;

/// Hex cells per byte column: high nibble, low nibble, trailing gap.
pub const HEX_SUB_CELLS: usize = 3;

/// Cells between the hex pane and the text pane.
pub const PANE_SEPARATOR_CELLS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    pub group_size: usize,
}

/// Which half of a byte a hex-pane hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nibble {
    High,
    Low,
}

/// Result of resolving a cell to a document position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub offset: usize,
    pub pane: Pane,
    pub nibble: Nibble,
    /// The hit sits past the last column of its row.
    pub end_of_line: bool,
}

impl Grid {
    /// Build a grid, rounding `group_size` down to a power of two that
    /// divides `columns` and forcing at least one row and column.
    pub fn new(rows: usize, columns: usize, group_size: usize) -> Self {
        let columns = columns.max(1);
        let mut group = prev_power_of_two(group_size.max(1));
        while columns % group != 0 {
            group /= 2;
        }
        Self {
            rows: rows.max(1),
            columns,
            group_size: group,
        }
    }

    /// Bytes shown by the full rows of the grid.
    pub fn page_len(&self) -> usize {
        self.rows * self.columns
    }

    pub fn offset_to_cell(&self, offset: usize, base: usize) -> (usize, usize) {
        let rel = offset - base;
        (rel / self.columns, rel % self.columns)
    }

    pub fn cell_to_offset(&self, row: usize, column: usize, base: usize) -> usize {
        base + row * self.columns + column
    }

    /// First offset of visible `row`.
    pub fn row_start(&self, row: usize, base: usize) -> usize {
        self.cell_to_offset(row, 0, base)
    }

    /// Row of `offset` relative to `base`, or `None` when it lies above the window.
    pub fn row_of(&self, offset: usize, base: usize) -> Option<usize> {
        offset.checked_sub(base).map(|rel| rel / self.columns)
    }

    /// Resolve a cell of visible `row` to a document position, clamped to `size`.
    pub fn hit_test(&self, row: usize, cell: usize, base: usize, size: usize) -> HitTarget {
        let hex_width = self.columns * HEX_SUB_CELLS;
        let text_start = hex_width + PANE_SEPARATOR_CELLS;
        let row_start = self.row_start(row, base);

        let (column, pane, nibble, past_column) = if cell < hex_width {
            let column = cell / HEX_SUB_CELLS;
            match cell % HEX_SUB_CELLS {
                0 => (column, Pane::Hex, Nibble::High, false),
                1 => (column, Pane::Hex, Nibble::Low, false),
                _ => (column + 1, Pane::Hex, Nibble::High, true),
            }
        } else if cell < text_start {
            (self.columns, Pane::Hex, Nibble::High, true)
        } else {
            let column = (cell - text_start).min(self.columns);
            (column, Pane::Text, Nibble::High, column == self.columns)
        };

        let end_of_line = past_column && column == self.columns;
        let offset = (row_start + column).min(size);
        HitTarget {
            offset,
            pane,
            nibble,
            // A clamped hit on an empty tail is a plain end-of-document position.
            end_of_line: end_of_line && offset == row_start + column && offset > 0,
        }
    }
}

/// Maximum column count fitting `budget` when each column costs `unit_cost`,
/// rounded down to a multiple of `group`, capped at [`MAX_COLUMNS`] and never
/// below `group`.
pub fn fit_columns(budget: usize, unit_cost: usize, group: usize) -> usize {
    let group = group.max(1);
    let raw = budget / unit_cost.max(1);
    let fitted = (raw / group) * group;
    let cap = (MAX_COLUMNS / group).max(1) * group;
    fitted.min(cap).max(group)
}

fn prev_power_of_two(n: usize) -> usize {
    if n.is_power_of_two() {
        n
    } else {
        n.next_power_of_two() / 2
    }
}
