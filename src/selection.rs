//! Selection model: anchor, drag end and row-level repaint invalidation.

use std::ops::Range;

use crate::grid::Grid;

/// Normalized selection, `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub start: usize,
    pub length: usize,
}

impl SelectionRange {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    fn intersect(&self, range: &Range<usize>) -> Range<usize> {
        let lo = self.start.max(range.start);
        let hi = self.end().min(range.end);
        if lo < hi { lo..hi } else { 0..0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoints {
    anchor: usize,
    drag_end: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    endpoints: Option<Endpoints>,
    live: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.endpoints.is_some()
    }

    /// True while a pointer drag is extending the selection.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn anchor(&self) -> Option<usize> {
        self.endpoints.map(|e| e.anchor)
    }

    pub fn range(&self) -> Option<SelectionRange> {
        self.endpoints.map(|e| SelectionRange {
            start: e.anchor.min(e.drag_end),
            length: e.anchor.abs_diff(e.drag_end),
        })
    }

    /// Non-empty selected range.
    pub fn non_empty(&self) -> Option<SelectionRange> {
        self.range().filter(|r| r.length > 0)
    }

    /// Begin (or continue) a drag. An existing anchor is kept so further
    /// drags extend the same selection.
    pub fn start_drag(&mut self, offset: usize) {
        if self.endpoints.is_none() {
            self.endpoints = Some(Endpoints {
                anchor: offset,
                drag_end: offset,
            });
        }
        self.live = true;
    }

    /// Move the far endpoint and return the visible rows whose selected
    /// bytes changed.
    pub fn update_drag(&mut self, offset: usize, grid: &Grid, base: usize) -> Vec<usize> {
        let old = self.range();
        let endpoints = self.endpoints.get_or_insert(Endpoints {
            anchor: offset,
            drag_end: offset,
        });
        endpoints.drag_end = offset;
        let new = self.range();
        dirty_rows(old, new, grid, base)
    }

    pub fn end_drag(&mut self) {
        self.live = false;
    }

    /// Replace the selection outright; returns the rows to repaint.
    pub fn select_range(&mut self, start: usize, length: usize, grid: &Grid, base: usize) -> Vec<usize> {
        let old = self.range();
        self.endpoints = Some(Endpoints {
            anchor: start,
            drag_end: start + length,
        });
        self.live = false;
        dirty_rows(old, self.range(), grid, base)
    }

    pub fn clear(&mut self, grid: &Grid, base: usize) -> Vec<usize> {
        let old = self.range();
        self.endpoints = None;
        self.live = false;
        dirty_rows(old, None, grid, base)
    }

    /// Keep both endpoints within `[0, size]` after the document shrank.
    pub fn clamp(&mut self, size: usize) {
        if let Some(e) = self.endpoints.as_mut() {
            e.anchor = e.anchor.min(size);
            e.drag_end = e.drag_end.min(size);
        }
    }
}

/// Visible rows spanned by `range`, clipped to the grid.
fn row_span(range: Option<SelectionRange>, grid: &Grid, base: usize) -> Option<Range<usize>> {
    let range = range.filter(|r| r.length > 0)?;
    let last = range.end() - 1;
    if last < base {
        return None;
    }
    let first_row = grid.row_of(range.start, base).unwrap_or(0);
    let last_row = grid.row_of(last, base).unwrap_or(0);
    if first_row >= grid.rows {
        return None;
    }
    Some(first_row..(last_row + 1).min(grid.rows))
}

/// Rows in either selection's span whose selected bytes differ between the two.
pub fn dirty_rows(
    old: Option<SelectionRange>,
    new: Option<SelectionRange>,
    grid: &Grid,
    base: usize,
) -> Vec<usize> {
    let spans = [row_span(old, grid, base), row_span(new, grid, base)];
    let lo = spans.iter().flatten().map(|s| s.start).min();
    let hi = spans.iter().flatten().map(|s| s.end).max();
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return Vec::new();
    };

    let empty = SelectionRange::default();
    (lo..hi)
        .filter(|&row| spans.iter().flatten().any(|s| s.contains(&row)))
        .filter(|&row| {
            let start = grid.row_start(row, base);
            let bytes = start..start + grid.columns;
            old.unwrap_or(empty).intersect(&bytes) != new.unwrap_or(empty).intersect(&bytes)
        })
        .collect()
}

/// Collapse sorted row indices into contiguous ranges.
pub fn coalesce_rows(rows: &[usize]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for &row in rows {
        match ranges.last_mut() {
            Some(last) if last.end == row => last.end = row + 1,
            _ => ranges.push(row..row + 1),
        }
    }
    ranges
}

/// Vertical direction of a drag auto-scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Edge auto-scroll while a drag pointer hovers near the top or bottom of the viewport.
///
/// Units are whatever the host measures the pointer in (pixels, terminal rows);
/// `threshold` and `line_height` must use the same unit.
#[derive(Debug, Clone)]
pub struct AutoScroll {
    threshold: i32,
    line_height: i32,
    tuning: i32,
    active: Option<(ScrollDirection, usize)>,
}

impl AutoScroll {
    pub fn new(threshold: i32, line_height: i32, tuning: i32) -> Self {
        Self {
            threshold: threshold.max(0),
            line_height: line_height.max(1),
            tuning: tuning.max(1),
            active: None,
        }
    }

    /// Re-evaluate for a pointer at `y` in a viewport `height` tall
    /// (`y` may be negative or past `height` while dragging outside).
    pub fn track_pointer(&mut self, y: i32, height: i32) -> Option<(ScrollDirection, usize)> {
        let bottom_edge = height - self.threshold;
        self.active = if y < self.threshold {
            Some((ScrollDirection::Up, self.speed(self.threshold - y)))
        } else if y >= bottom_edge {
            Some((ScrollDirection::Down, self.speed(y - bottom_edge + 1)))
        } else {
            None
        };
        self.active
    }

    /// `max(1, distance² / (line_height * tuning))` rows per tick.
    pub fn speed(&self, distance: i32) -> usize {
        let d = i64::from(distance.max(0));
        let divisor = i64::from(self.line_height) * i64::from(self.tuning);
        ((d * d) / divisor).max(1) as usize
    }

    pub fn active(&self) -> Option<(ScrollDirection, usize)> {
        self.active
    }

    pub fn stop(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn grid() -> Grid {
        Grid::new(4, 16, 8)
    }

    #[test]
    fn anchor_survives_a_second_drag() {
        let mut sel = Selection::new();
        sel.start_drag(10);
        sel.update_drag(15, &grid(), 0);
        sel.end_drag();
        assert!(!sel.is_live());

        sel.start_drag(15);
        sel.update_drag(20, &grid(), 0);
        assert_eq!(sel.range(), Some(SelectionRange { start: 10, length: 10 }));
    }

    #[test]
    fn dragging_backwards_normalizes() {
        let mut sel = Selection::new();
        sel.start_drag(30);
        sel.update_drag(12, &grid(), 0);
        assert_eq!(sel.range(), Some(SelectionRange { start: 12, length: 18 }));
    }

    #[test]
    fn small_delta_dirties_one_row() {
        let mut sel = Selection::new();
        sel.start_drag(2);
        sel.update_drag(40, &grid(), 0);
        assert_eq!(sel.update_drag(41, &grid(), 0), vec![2]);
    }

    #[test]
    fn crossing_rows_dirties_only_changed_rows() {
        let mut sel = Selection::new();
        sel.start_drag(5);
        assert_eq!(sel.update_drag(20, &grid(), 0), vec![0, 1]);
        assert_eq!(sel.update_drag(50, &grid(), 0), vec![1, 2, 3]);
        assert_eq!(sel.update_drag(36, &grid(), 0), vec![2, 3]);
    }

    #[test]
    fn rows_outside_the_window_are_ignored() {
        let mut sel = Selection::new();
        sel.start_drag(0);
        assert_eq!(sel.update_drag(200, &grid(), 64), vec![0, 1, 2, 3]);
        assert!(sel.update_drag(199, &grid(), 64).is_empty());
    }

    #[test]
    fn clear_dirties_previous_rows() {
        let mut sel = Selection::new();
        sel.select_range(16, 20, &grid(), 0);
        assert_eq!(sel.clear(&grid(), 0), vec![1, 2]);
        assert!(!sel.is_active());
    }

    #[test]
    fn clamp_pulls_endpoints_in() {
        let mut sel = Selection::new();
        sel.select_range(10, 30, &grid(), 0);
        sel.clamp(25);
        assert_eq!(sel.range(), Some(SelectionRange { start: 10, length: 15 }));
    }

    #[test]
    fn coalesce() {
        assert_eq!(coalesce_rows(&[0, 1, 2, 5, 7, 8]), vec![0..3, 5..6, 7..9]);
        assert!(coalesce_rows(&[]).is_empty());
    }

    #[test]
    fn autoscroll_speed_grows_quadratically() {
        let mut scroll = AutoScroll::new(2, 1, 4);
        assert_eq!(scroll.track_pointer(10, 20), None);
        assert_eq!(scroll.track_pointer(1, 20), Some((ScrollDirection::Up, 1)));
        assert_eq!(scroll.track_pointer(-6, 20), Some((ScrollDirection::Up, 16)));
        assert_eq!(scroll.track_pointer(18, 20), Some((ScrollDirection::Down, 1)));
        assert_eq!(scroll.track_pointer(25, 20), Some((ScrollDirection::Down, 16)));
        scroll.stop();
        assert_eq!(scroll.active(), None);
    }
}
