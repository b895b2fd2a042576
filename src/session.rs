//! The editing session: the host-facing surface of the core.
//!
//! A session owns the document, the viewport window, the caret and the
//! selection, and keeps them consistent across navigation, edits and
//! scrolling. Hosts feed it [`InputIntent`]s or call the individual
//! operations, then drain [`SessionEvent`]s to learn what to repaint.

use std::ops::Range;

use tracing::debug;

use crate::caret::{Caret, CaretPosition, Pane};
use crate::document::DocumentSource;
use crate::edit::{Change, EditEngine};
use crate::error::EditResult;
use crate::grid::{Grid, HitTarget};
use crate::input::{InputIntent, Motion};
use crate::selection::{AutoScroll, ScrollDirection, Selection, SelectionRange, coalesce_rows};
use crate::viewport::{DEFAULT_LOOKAHEAD, ViewportCache, VisibleBytes};

/// Drag auto-scroll tuning, in the host's pointer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoScrollSettings {
    pub threshold: i32,
    pub line_height: i32,
    pub tuning: i32,
}

impl Default for AutoScrollSettings {
    fn default() -> Self {
        Self {
            threshold: 2,
            line_height: 1,
            tuning: 4,
        }
    }
}

/// Everything the core needs to know about layout and editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub rows: usize,
    pub columns: usize,
    pub group_size: usize,
    pub lookahead: usize,
    pub insert_mode: bool,
    pub autoscroll: AutoScrollSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: 16,
            columns: 16,
            group_size: 8,
            lookahead: DEFAULT_LOOKAHEAD,
            insert_mode: false,
            autoscroll: AutoScrollSettings::default(),
        }
    }
}

/// Change notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CaretMoved(CaretPosition),
    SelectionChanged(Option<SelectionRange>),
    /// Visible rows that need repainting.
    RowsDirty(Range<usize>),
}

pub struct EditorSession<D: DocumentSource> {
    doc: D,
    viewport: ViewportCache,
    caret: Caret,
    selection: Selection,
    engine: EditEngine,
    autoscroll: AutoScroll,
    /// Last (row, cell) the drag pointer resolved, replayed after auto-scroll.
    drag_cell: Option<(usize, usize)>,
    events: Vec<SessionEvent>,
}

impl<D: DocumentSource> EditorSession<D> {
    pub fn new(doc: D, config: SessionConfig) -> EditResult<Self> {
        let grid = Grid::new(config.rows, config.columns, config.group_size);
        let mut viewport =
            ViewportCache::new(grid, config.lookahead)?.with_group_size(config.group_size);
        viewport.rebuffer(&doc);
        let mut caret = Caret::new();
        caret.update_visibility(0, grid.page_len());
        let scroll = config.autoscroll;
        Ok(Self {
            doc,
            viewport,
            caret,
            selection: Selection::new(),
            engine: EditEngine::new(config.insert_mode),
            autoscroll: AutoScroll::new(scroll.threshold, scroll.line_height, scroll.tuning),
            drag_cell: None,
            events: Vec::new(),
        })
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Direct document access. Changes made through this must be reported
    /// with [`EditorSession::notify_range_changed`] or
    /// [`EditorSession::notify_structure_changed`].
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn into_document(self) -> D {
        self.doc
    }

    pub fn size(&self) -> usize {
        self.doc.size()
    }

    pub fn grid(&self) -> Grid {
        self.viewport.grid()
    }

    pub fn viewport(&self) -> &ViewportCache {
        &self.viewport
    }

    pub fn base(&self) -> usize {
        self.viewport.base()
    }

    pub fn insert_mode(&self) -> bool {
        self.engine.insert_mode()
    }

    pub fn set_insert_mode(&mut self, insert_mode: bool) {
        self.engine.set_insert_mode(insert_mode);
    }

    /// Drain pending change notifications.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- viewport -------------------------------------------------------

    pub fn set_viewport_base(&mut self, offset: usize) {
        let offset = offset.min(self.doc.size());
        let before = self.viewport.base();
        self.viewport.set_base(offset, &self.doc);
        if before != offset {
            self.dirty_all_rows();
        }
        self.refresh_caret_visibility();
    }

    pub fn resize_viewport(&mut self, rows: usize, columns: usize) -> EditResult<()> {
        self.viewport.resize(rows, columns, &self.doc)?;
        self.dirty_all_rows();
        self.refresh_caret_visibility();
        Ok(())
    }

    pub fn visible_bytes(&self) -> VisibleBytes<'_> {
        self.viewport.visible_bytes()
    }

    /// Scroll by whole rows. The row phase of the current base is kept,
    /// except that scrolling up stops at offset 0 so the document head stays
    /// reachable.
    pub fn scroll_rows(&mut self, rows: isize) {
        let grid = self.grid();
        let base = self.viewport.base();
        let step = rows.unsigned_abs().saturating_mul(grid.columns);
        let target = if rows < 0 {
            base.saturating_sub(step)
        } else {
            base.saturating_add(step).min(self.last_row_start())
        };
        self.set_viewport_base(target);
    }

    /// Start of the last row holding document bytes, in the current row phase.
    fn last_row_start(&self) -> usize {
        let grid = self.grid();
        let base = self.viewport.base();
        let last = self.doc.size().saturating_sub(1);
        if last <= base {
            return base;
        }
        base + ((last - base) / grid.columns) * grid.columns
    }

    /// Slide the window the fewest rows that bring the caret into view.
    pub fn scroll_to_caret(&mut self) {
        let grid = self.grid();
        let base = self.viewport.base();
        let probe = self.caret.display_offset();
        let page = grid.page_len();

        let target = if probe < base {
            let rows_back = (base - probe).div_ceil(grid.columns);
            base.saturating_sub(rows_back * grid.columns)
        } else if probe >= base + page {
            let rows_fwd = (probe - (base + page)) / grid.columns + 1;
            base + rows_fwd * grid.columns
        } else {
            base
        };
        self.set_viewport_base(target);
    }

    // ---- caret & selection ----------------------------------------------

    pub fn caret(&self) -> CaretPosition {
        self.caret.position()
    }

    pub fn caret_visible(&self) -> bool {
        self.caret.is_visible()
    }

    /// Move the caret, optionally extending the selection from its old position.
    pub fn move_caret(&mut self, offset: usize, extend: bool) {
        self.place_caret(offset, extend, false);
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection.range()
    }

    pub fn selection_is_live(&self) -> bool {
        self.selection.is_live()
    }

    /// Select `[start, start + length)`, clamped to the document, and put the
    /// caret at its end.
    pub fn select_range(&mut self, start: usize, length: usize) {
        let size = self.doc.size();
        let start = start.min(size);
        let length = length.min(size - start);
        let (grid, base) = (self.grid(), self.viewport.base());
        let rows = self.selection.select_range(start, length, &grid, base);
        self.emit_rows(&rows);
        self.events
            .push(SessionEvent::SelectionChanged(self.selection.range()));
        self.set_caret(start + length, false);
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_active() {
            return;
        }
        let (grid, base) = (self.grid(), self.viewport.base());
        let rows = self.selection.clear(&grid, base);
        self.emit_rows(&rows);
        self.events.push(SessionEvent::SelectionChanged(None));
    }

    /// Copy of the selected bytes.
    pub fn selected_bytes(&self) -> EditResult<Vec<u8>> {
        let Some(range) = self.selection.non_empty() else {
            return Ok(Vec::new());
        };
        let mut bytes = vec![0; range.length];
        self.doc.read_exact(range.start, &mut bytes)?;
        Ok(bytes)
    }

    pub fn hit_test(&self, row: usize, cell: usize) -> HitTarget {
        self.grid()
            .hit_test(row, cell, self.viewport.base(), self.doc.size())
    }

    // ---- pointer drag ---------------------------------------------------

    /// Pointer pressed on `(row, cell)`. With `extend` the existing selection
    /// (or the caret) keeps its anchor.
    pub fn begin_drag_at(&mut self, row: usize, cell: usize, extend: bool) {
        let hit = self.hit_test(row, cell);
        if !extend {
            self.clear_selection();
        }
        let anchor = if extend { self.caret.offset() } else { hit.offset };
        if self.caret.pane() != hit.pane {
            self.caret.switch_pane(hit.pane);
        }
        self.selection.start_drag(anchor);
        self.drag_cell = Some((row, cell));
        self.drag_to_hit(hit);
    }

    /// Pointer moved while pressed.
    pub fn drag_to(&mut self, row: usize, cell: usize) {
        if !self.selection.is_live() {
            return;
        }
        self.drag_cell = Some((row, cell));
        let hit = self.hit_test(row, cell);
        self.drag_to_hit(hit);
    }

    fn drag_to_hit(&mut self, hit: HitTarget) {
        let (grid, base) = (self.grid(), self.viewport.base());
        let before = self.caret.position();
        self.caret.move_to(hit.offset, self.doc.size());
        self.caret.set_end_of_line(hit.end_of_line);
        let rows = self.selection.update_drag(hit.offset, &grid, base);
        if !rows.is_empty() {
            self.emit_rows(&rows);
            self.events
                .push(SessionEvent::SelectionChanged(self.selection.range()));
        }
        self.refresh_caret_visibility();
        self.emit_caret_if_moved(before);
    }

    /// Report the drag pointer's vertical position (`y` relative to the
    /// viewport top, `height` the viewport height) to arm or disarm edge
    /// auto-scroll.
    pub fn track_pointer(&mut self, y: i32, height: i32) -> Option<(ScrollDirection, usize)> {
        if !self.selection.is_live() {
            self.autoscroll.stop();
            return None;
        }
        self.autoscroll.track_pointer(y, height)
    }

    pub fn autoscroll_active(&self) -> bool {
        self.selection.is_live() && self.autoscroll.active().is_some()
    }

    /// One auto-scroll timer tick: scroll `speed` rows toward the edge and
    /// extend the drag to the edge row. Returns whether anything scrolled.
    pub fn autoscroll_tick(&mut self) -> bool {
        if !self.selection.is_live() {
            self.autoscroll.stop();
            return false;
        }
        let Some((direction, speed)) = self.autoscroll.active() else {
            return false;
        };
        let before = self.viewport.base();
        let speed = isize::try_from(speed).unwrap_or(isize::MAX);
        let edge_row = match direction {
            ScrollDirection::Up => {
                self.scroll_rows(-speed);
                0
            }
            ScrollDirection::Down => {
                self.scroll_rows(speed);
                self.grid().rows - 1
            }
        };
        if let Some((_, cell)) = self.drag_cell {
            self.drag_to(edge_row, cell);
        }
        self.viewport.base() != before
    }

    pub fn end_drag(&mut self) {
        self.selection.end_drag();
        self.autoscroll.stop();
        self.drag_cell = None;
        if self.selection.non_empty().is_none() && self.selection.is_active() {
            // A click without movement leaves no selection behind.
            self.clear_selection();
        }
    }

    // ---- editing --------------------------------------------------------

    pub fn handle_hex_digit(&mut self, digit: u8) -> EditResult<()> {
        let change = self
            .engine
            .hex_digit(&mut self.doc, &mut self.viewport, &mut self.caret, digit)?;
        self.after_typing(change);
        Ok(())
    }

    pub fn handle_text_byte(&mut self, value: u8) -> EditResult<()> {
        let change = self
            .engine
            .text_byte(&mut self.doc, &mut self.viewport, &mut self.caret, value)?;
        self.after_typing(change);
        Ok(())
    }

    pub fn handle_backspace(&mut self) -> EditResult<()> {
        let selected = self.selection.non_empty();
        let change = self.engine.backspace(
            &mut self.doc,
            &mut self.viewport,
            &mut self.caret,
            selected,
        )?;
        self.after_removal(change, selected.is_some());
        Ok(())
    }

    pub fn handle_delete(&mut self) -> EditResult<()> {
        let selected = self.selection.non_empty();
        let change =
            self.engine
                .delete(&mut self.doc, &mut self.viewport, &mut self.caret, selected)?;
        self.after_removal(change, selected.is_some());
        Ok(())
    }

    /// Toggle the pending-nibble state of the caret (hex pane only).
    pub fn toggle_nibble(&mut self) {
        if self.caret.toggle_nibble() {
            self.events
                .push(SessionEvent::CaretMoved(self.caret.position()));
        }
    }

    pub fn switch_pane(&mut self, pane: Pane) {
        if self.caret.pane() == pane && !self.caret.nibble_high() {
            return;
        }
        self.caret.switch_pane(pane);
        self.events
            .push(SessionEvent::CaretMoved(self.caret.position()));
        self.dirty_caret_row();
    }

    /// Dispatch one decoded input intent.
    pub fn apply(&mut self, intent: InputIntent) -> EditResult<()> {
        match intent {
            InputIntent::HexDigit(d) => self.handle_hex_digit(d)?,
            InputIntent::TextByte(b) => self.handle_text_byte(b)?,
            InputIntent::Move(motion) => self.apply_motion(motion, false),
            InputIntent::Extend(motion) => self.apply_motion(motion, true),
            InputIntent::Delete => self.handle_delete()?,
            InputIntent::Backspace => self.handle_backspace()?,
            InputIntent::SwitchPane => self.switch_pane(self.caret.pane().other()),
            InputIntent::ToggleInsertMode => {
                let insert = !self.engine.insert_mode();
                self.engine.set_insert_mode(insert);
            }
            InputIntent::SelectAll => self.select_range(0, self.doc.size()),
            InputIntent::Scroll(rows) => self.scroll_rows(rows),
        }
        Ok(())
    }

    /// An out-of-band in-place change to `[begin, end)` (or to the end of the
    /// document when `end` is `None`).
    pub fn notify_range_changed(&mut self, begin: usize, end: Option<usize>) {
        if self.viewport.hint_range_changed(begin, end, &self.doc) {
            self.dirty_from(begin, end);
        }
        self.clamp_to_document();
    }

    /// An out-of-band insert or removal: everything may have moved.
    pub fn notify_structure_changed(&mut self) {
        self.viewport.rebuffer(&self.doc);
        self.clamp_to_document();
        self.dirty_all_rows();
    }

    // ---- internals ------------------------------------------------------

    fn apply_motion(&mut self, motion: Motion, extend: bool) {
        let grid = self.grid();
        let size = self.doc.size();
        let offset = self.caret.offset();
        let at_eol = self.caret.at_end_of_line();
        let page = grid.page_len();
        let line_start = self.line_start(self.caret.display_offset());

        // From the end-of-line position, vertical moves stay at the end of
        // the row above or below.
        let (target, eol) = match motion {
            Motion::Left => (offset.saturating_sub(1), false),
            Motion::Right if at_eol => (offset, false),
            Motion::Right => ((offset + 1).min(size), false),
            Motion::Up if at_eol && offset > grid.columns => (offset - grid.columns, true),
            Motion::Up if !at_eol && offset >= grid.columns => (offset - grid.columns, false),
            Motion::Up => (offset, at_eol),
            Motion::Down if offset + grid.columns <= size => (offset + grid.columns, at_eol),
            Motion::Down => (offset, at_eol),
            Motion::PageUp => {
                self.scroll_rows(-(grid.rows as isize));
                (offset.saturating_sub(page), false)
            }
            Motion::PageDown => {
                self.scroll_rows(grid.rows as isize);
                ((offset + page).min(size), false)
            }
            Motion::LineStart => (line_start, false),
            Motion::LineEnd => {
                let end = line_start + grid.columns;
                if end <= size { (end, true) } else { (size, false) }
            }
            Motion::DocumentStart => (0, false),
            Motion::DocumentEnd => (size, false),
        };
        self.place_caret(target, extend, eol);
    }

    /// First offset of the row `offset` is drawn on, in the current row phase.
    fn line_start(&self, offset: usize) -> usize {
        let columns = self.grid().columns;
        let phase = self.viewport.base() % columns;
        offset.saturating_sub((offset % columns + columns - phase) % columns)
    }

    fn place_caret(&mut self, target: usize, extend: bool, eol: bool) {
        if extend {
            let (grid, base) = (self.grid(), self.viewport.base());
            let from = self.caret.offset();
            self.selection.start_drag(from);
            self.set_caret(target, eol);
            let rows = self
                .selection
                .update_drag(self.caret.offset(), &grid, base);
            self.selection.end_drag();
            self.emit_rows(&rows);
            self.events
                .push(SessionEvent::SelectionChanged(self.selection.range()));
        } else {
            self.clear_selection();
            self.set_caret(target, eol);
        }
    }

    fn set_caret(&mut self, target: usize, eol: bool) {
        let before = self.caret.position();
        self.caret.move_to(target, self.doc.size());
        self.caret.set_end_of_line(eol);
        self.scroll_to_caret();
        self.refresh_caret_visibility();
        self.emit_caret_if_moved(before);
    }

    fn after_typing(&mut self, change: Change) {
        self.clear_selection();
        self.after_change(change);
    }

    fn after_removal(&mut self, change: Change, removed_selection: bool) {
        if removed_selection {
            self.clear_selection();
        }
        self.after_change(change);
    }

    fn after_change(&mut self, change: Change) {
        self.clamp_to_document();
        match change {
            Change::None => {}
            Change::InPlace(offset) => self.dirty_from(offset, Some(offset + 1)),
            Change::Structural(offset) => self.dirty_from(offset, None),
        }
        self.scroll_to_caret();
        self.refresh_caret_visibility();
        self.events
            .push(SessionEvent::CaretMoved(self.caret.position()));
    }

    fn clamp_to_document(&mut self) {
        let size = self.doc.size();
        self.caret.clamp(size);
        self.selection.clamp(size);
    }

    fn refresh_caret_visibility(&mut self) {
        let page = self.grid().page_len();
        self.caret.update_visibility(self.viewport.base(), page);
    }

    fn emit_caret_if_moved(&mut self, before: CaretPosition) {
        let now = self.caret.position();
        if now != before {
            self.events.push(SessionEvent::CaretMoved(now));
        }
    }

    fn emit_rows(&mut self, rows: &[usize]) {
        for range in coalesce_rows(rows) {
            self.events.push(SessionEvent::RowsDirty(range));
        }
    }

    fn dirty_all_rows(&mut self) {
        let rows = self.grid().rows;
        self.events.push(SessionEvent::RowsDirty(0..rows));
    }

    fn dirty_caret_row(&mut self) {
        let grid = self.grid();
        if let Some(row) = grid.row_of(self.caret.display_offset(), self.viewport.base()) {
            if row < grid.rows {
                self.events.push(SessionEvent::RowsDirty(row..row + 1));
            }
        }
    }

    /// Repaint rows touched by a change to `[begin, end)`; `None` runs to the last row.
    fn dirty_from(&mut self, begin: usize, end: Option<usize>) {
        let grid = self.grid();
        let base = self.viewport.base();
        let first = grid.row_of(begin, base).unwrap_or(0);
        let last = match end {
            Some(end) if end > base => grid.row_of(end - 1, base).unwrap_or(0) + 1,
            Some(_) => return,
            None => grid.rows,
        };
        let last = last.min(grid.rows);
        if first < last {
            debug!(first, last, "rows dirty");
            self.events.push(SessionEvent::RowsDirty(first..last));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::MemoryDocument;
    use crate::error::EditError;

    fn session(bytes: Vec<u8>) -> EditorSession<MemoryDocument> {
        let config = SessionConfig {
            rows: 4,
            columns: 16,
            ..SessionConfig::default()
        };
        EditorSession::new(MemoryDocument::new(bytes), config).unwrap()
    }

    fn numbered(n: usize) -> Vec<u8> {
        (0..n).map(|i| i as u8).collect()
    }

    #[test]
    fn extend_from_selected_range() {
        let mut s = session(numbered(100));
        s.select_range(10, 5);
        assert_eq!(s.caret().offset, 15);
        s.move_caret(20, true);
        assert_eq!(s.selection(), Some(SelectionRange { start: 10, length: 10 }));
    }

    #[test]
    fn plain_move_clears_selection() {
        let mut s = session(numbered(100));
        s.select_range(10, 5);
        s.take_events();
        s.apply(InputIntent::Move(Motion::Right)).unwrap();
        assert_eq!(s.selection(), None);
        let events = s.take_events();
        assert!(events.contains(&SessionEvent::SelectionChanged(None)));
        assert!(events.contains(&SessionEvent::RowsDirty(0..1)));
    }

    #[test]
    fn shift_right_extends_one_byte_at_a_time() {
        let mut s = session(numbered(100));
        s.move_caret(4, false);
        for _ in 0..3 {
            s.apply(InputIntent::Extend(Motion::Right)).unwrap();
        }
        assert_eq!(s.selection(), Some(SelectionRange { start: 4, length: 3 }));
        assert!(!s.selection_is_live());
    }

    #[test]
    fn select_range_clamps_to_document() {
        let mut s = session(numbered(20));
        s.select_range(15, 50);
        assert_eq!(s.selection(), Some(SelectionRange { start: 15, length: 5 }));
        s.select_range(40, 5);
        assert_eq!(s.selection(), Some(SelectionRange { start: 20, length: 0 }));
    }

    #[test]
    fn caret_scrolls_into_view() {
        let mut s = session(numbered(500));
        s.move_caret(64, false);
        assert_eq!(s.base(), 16);
        assert!(s.caret_visible());

        s.move_caret(300, false);
        assert_eq!(s.base(), 240);
        s.move_caret(3, false);
        assert_eq!(s.base(), 0);
        assert_eq!(&*s.visible_bytes(), &numbered(500)[..67]);
    }

    #[test]
    fn line_end_uses_end_of_line_position() {
        let mut s = session(numbered(100));
        s.move_caret(5, false);
        s.apply(InputIntent::Move(Motion::LineEnd)).unwrap();
        let caret = s.caret();
        assert_eq!(caret.offset, 16);
        assert!(caret.at_end_of_line);

        // Line start from the end-of-line position stays on the same row.
        s.apply(InputIntent::Move(Motion::LineStart)).unwrap();
        assert_eq!(s.caret().offset, 0);
    }

    #[test]
    fn vertical_moves_keep_end_of_line_position() {
        let mut s = session(numbered(100));
        let row = |s: &EditorSession<MemoryDocument>| {
            let caret = s.caret();
            let shown = if caret.at_end_of_line { caret.offset - 1 } else { caret.offset };
            s.grid().row_of(shown, s.base())
        };

        s.move_caret(5, false);
        s.apply(InputIntent::Move(Motion::LineEnd)).unwrap();
        s.apply(InputIntent::Move(Motion::Down)).unwrap();
        assert_eq!((s.caret().offset, s.caret().at_end_of_line), (32, true));
        assert_eq!(row(&s), Some(1));

        s.apply(InputIntent::Move(Motion::Up)).unwrap();
        assert_eq!((s.caret().offset, s.caret().at_end_of_line), (16, true));
        assert_eq!(row(&s), Some(0));

        // Already on the top row: nowhere to go.
        s.apply(InputIntent::Move(Motion::Up)).unwrap();
        assert_eq!((s.caret().offset, s.caret().at_end_of_line), (16, true));

        // Right steps onto the first column of the next row.
        s.apply(InputIntent::Move(Motion::Right)).unwrap();
        assert_eq!((s.caret().offset, s.caret().at_end_of_line), (16, false));
        assert_eq!(row(&s), Some(1));
    }

    #[test]
    fn end_of_line_down_stops_at_last_full_row() {
        let mut s = session(numbered(40));
        s.move_caret(17, false);
        s.apply(InputIntent::Move(Motion::LineEnd)).unwrap();
        assert_eq!(s.caret().offset, 32);
        s.apply(InputIntent::Move(Motion::Down)).unwrap();
        assert_eq!((s.caret().offset, s.caret().at_end_of_line), (32, true));
    }

    #[test]
    fn scrolling_up_from_odd_phase_reaches_the_head() {
        let mut s = session(numbered(300));
        s.set_viewport_base(37);
        s.apply(InputIntent::Scroll(-1)).unwrap();
        assert_eq!(s.base(), 21);
        s.apply(InputIntent::Scroll(-3)).unwrap();
        assert_eq!(s.base(), 0);
    }

    #[test]
    fn line_end_on_short_last_row() {
        let mut s = session(numbered(20));
        s.move_caret(17, false);
        s.apply(InputIntent::Move(Motion::LineEnd)).unwrap();
        assert_eq!(s.caret().offset, 20);
        assert!(!s.caret().at_end_of_line);
    }

    #[test]
    fn typing_replaces_nothing_but_collapses_selection() {
        let mut s = session(vec![0xFF; 4]);
        s.select_range(1, 2);
        s.move_caret(0, true);
        s.handle_hex_digit(0).unwrap();
        assert_eq!(s.selection(), None);
        assert_eq!(s.document().bytes(), &[0x0F, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn read_only_edit_keeps_state() {
        let doc = MemoryDocument::new_read_only(numbered(10));
        let mut s = EditorSession::new(doc, SessionConfig::default()).unwrap();
        s.select_range(2, 3);
        let before = (s.caret(), s.selection());

        assert_eq!(s.handle_text_byte(b'x'), Err(EditError::ReadOnly));
        assert_eq!(s.handle_backspace(), Err(EditError::ReadOnly));
        assert_eq!(s.apply(InputIntent::HexDigit(1)), Err(EditError::ReadOnly));
        assert_eq!((s.caret(), s.selection()), before);
    }

    #[test]
    fn backspace_removes_selection() {
        let mut s = session(numbered(10));
        s.select_range(2, 3);
        s.handle_backspace().unwrap();
        assert_eq!(s.document().bytes(), &[0, 1, 5, 6, 7, 8, 9]);
        assert_eq!(s.caret().offset, 2);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn in_place_edit_dirties_one_row() {
        let mut s = session(numbered(64));
        s.move_caret(20, false);
        s.take_events();
        s.handle_hex_digit(0xA).unwrap();
        let events = s.take_events();
        assert!(events.contains(&SessionEvent::RowsDirty(1..2)));
        assert!(!events.iter().any(|e| *e == SessionEvent::RowsDirty(1..4)));
    }

    #[test]
    fn structural_edit_dirties_following_rows() {
        let mut s = session(numbered(64));
        s.set_insert_mode(true);
        s.move_caret(20, false);
        s.take_events();
        s.handle_text_byte(b'q').unwrap();
        assert!(s.take_events().contains(&SessionEvent::RowsDirty(1..4)));
        assert_eq!(s.viewport().byte_at(20), Some(b'q'));
    }

    #[test]
    fn mouse_drag_selects_across_panes_cells() {
        let mut s = session(numbered(100));
        // Row 0, byte 2 high nibble.
        s.begin_drag_at(0, 6, false);
        assert!(s.selection_is_live());
        // Row 1, text pane column 3.
        s.drag_to(1, 3 * 16 + 1 + 3);
        s.end_drag();
        assert_eq!(s.selection(), Some(SelectionRange { start: 2, length: 17 }));
        assert_eq!(s.caret().offset, 19);
        assert!(!s.selection_is_live());
    }

    #[test]
    fn click_without_drag_leaves_no_selection() {
        let mut s = session(numbered(100));
        s.begin_drag_at(1, 0, false);
        s.end_drag();
        assert_eq!(s.selection(), None);
        assert_eq!(s.caret().offset, 16);
    }

    #[test]
    fn autoscroll_extends_drag_downward() {
        let mut s = session(numbered(1000));
        s.begin_drag_at(0, 0, false);
        assert_eq!(s.track_pointer(10, 4), Some((ScrollDirection::Down, 20)));
        assert!(s.autoscroll_tick());
        assert_eq!(s.base(), 20 * 16);
        let sel = s.selection().unwrap();
        assert_eq!(sel.start, 0);
        assert_eq!(sel.length, s.base() + 3 * 16);

        s.end_drag();
        assert!(!s.autoscroll_active());
        assert!(!s.autoscroll_tick());
    }

    #[test]
    fn scrolling_stops_at_last_row() {
        let mut s = session(numbered(100));
        s.apply(InputIntent::Scroll(50)).unwrap();
        assert_eq!(s.base(), 96);
        s.apply(InputIntent::Scroll(-2)).unwrap();
        assert_eq!(s.base(), 64);
        s.apply(InputIntent::Scroll(-10)).unwrap();
        assert_eq!(s.base(), 0);
    }

    #[test]
    fn selected_bytes_reads_the_range() {
        let mut s = session(numbered(40));
        assert!(s.selected_bytes().unwrap().is_empty());
        s.select_range(30, 4);
        assert_eq!(s.selected_bytes().unwrap(), vec![30, 31, 32, 33]);
    }

    #[test]
    fn out_of_band_changes_refresh_the_window() {
        let mut s = session(numbered(40));
        s.document_mut().overwrite_byte(3, 0xEE).unwrap();
        s.notify_range_changed(3, Some(4));
        assert_eq!(s.viewport().byte_at(3), Some(0xEE));

        s.move_caret(40, false);
        s.document_mut().remove_range(0, 30).unwrap();
        s.notify_structure_changed();
        assert_eq!(s.caret().offset, 10);
        assert_eq!(&*s.visible_bytes(), s.document().bytes());
    }

    #[test]
    fn resize_keeps_caret_and_refills() {
        let mut s = session(numbered(300));
        s.move_caret(100, false);
        s.resize_viewport(8, 32).unwrap();
        assert_eq!(s.grid().columns, 32);
        assert_eq!(s.viewport().capacity(), 8 * 32 + DEFAULT_LOOKAHEAD);
        let base = s.base();
        assert_eq!(&*s.visible_bytes(), &numbered(300)[base..]);
    }
}
