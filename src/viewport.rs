//! Viewport window cache.
//!
//! Mirrors the document range `[base, base + valid_len)` into a fixed-capacity
//! buffer of `rows * columns + lookahead` bytes. Sliding the window re-reads
//! only the bytes that scrolled into view; resizes keep the existing prefix.
//!
//! The window lives behind an `RwLock` so hint refills coming from a
//! background mutator can run through `&self` while the UI thread paints
//! from [`ViewportCache::visible_bytes`]. Everything else in the core is
//! owned by the UI thread.

use std::ops::Deref;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::document::DocumentSource;
use crate::error::{EditError, EditResult};
use crate::grid::Grid;

/// Extra bytes past the last full row, for cells that look one byte ahead.
pub const DEFAULT_LOOKAHEAD: usize = 3;

/// How a refill was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refill {
    Unchanged,
    /// Kept part of the old window and read `read` new bytes.
    Partial { read: usize },
    /// Re-read the whole window.
    Full { read: usize },
}

#[derive(Debug)]
struct Window {
    base: usize,
    /// Always `capacity` bytes long; only `..valid` mirrors the document.
    data: Vec<u8>,
    valid: usize,
}

#[derive(Debug)]
pub struct ViewportCache {
    grid: Grid,
    /// Group size as configured; `grid.group_size` is this rounded for the current columns.
    group_request: usize,
    lookahead: usize,
    window: RwLock<Window>,
}

/// Read guard over the valid part of the window.
pub struct VisibleBytes<'a> {
    guard: RwLockReadGuard<'a, Window>,
}

impl VisibleBytes<'_> {
    pub fn base(&self) -> usize {
        self.guard.base
    }
}

impl Deref for VisibleBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard.data[..self.guard.valid]
    }
}

fn window_capacity(grid: &Grid, lookahead: usize) -> EditResult<usize> {
    grid.rows
        .checked_mul(grid.columns)
        .and_then(|n| n.checked_add(lookahead))
        .ok_or(EditError::Allocation { bytes: usize::MAX })
}

fn allocate(bytes: usize) -> EditResult<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(bytes)
        .map_err(|_| EditError::Allocation { bytes })?;
    data.resize(bytes, 0);
    Ok(data)
}

impl ViewportCache {
    /// Create an empty window at base 0. Call [`ViewportCache::rebuffer`] to fill it.
    pub fn new(grid: Grid, lookahead: usize) -> EditResult<Self> {
        let data = allocate(window_capacity(&grid, lookahead)?)?;
        Ok(Self {
            grid,
            group_request: grid.group_size,
            lookahead,
            window: RwLock::new(Window {
                base: 0,
                data,
                valid: 0,
            }),
        })
    }

    fn read_window(&self) -> RwLockReadGuard<'_, Window> {
        // A panicking hint can only leave stale bytes behind; the next refill fixes them.
        self.window.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_window(&self) -> RwLockWriteGuard<'_, Window> {
        self.window.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Group size to re-derive from on every resize, when the configured
    /// value does not divide the initial column count.
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_request = group_size;
        self
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    pub fn capacity(&self) -> usize {
        self.grid.page_len() + self.lookahead
    }

    pub fn base(&self) -> usize {
        self.read_window().base
    }

    pub fn valid_len(&self) -> usize {
        self.read_window().valid
    }

    pub fn visible_bytes(&self) -> VisibleBytes<'_> {
        VisibleBytes {
            guard: self.read_window(),
        }
    }

    /// Cached byte at absolute `offset`, if it lies in the valid window.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        let w = self.read_window();
        let rel = offset.checked_sub(w.base)?;
        (rel < w.valid).then(|| w.data[rel])
    }

    /// Slide the window to start at `new_base`.
    pub fn set_base<D: DocumentSource + ?Sized>(&mut self, new_base: usize, doc: &D) -> Refill {
        let capacity = self.capacity();
        let mut w = self.write_window();
        if new_base == w.base {
            return Refill::Unchanged;
        }

        let delta = new_base.abs_diff(w.base);
        let refill = if delta >= w.valid {
            fill(&mut w, new_base, capacity, doc)
        } else if new_base > w.base {
            // Scrolling down: keep the tail of the old window at the front.
            let keep = w.valid - delta;
            let valid = w.valid;
            w.data.copy_within(delta..valid, 0);
            let read = doc.read(new_base + keep, &mut w.data[keep..capacity]);
            w.base = new_base;
            w.valid = keep + read;
            Refill::Partial { read }
        } else {
            // Scrolling up: keep the head of the old window at the back.
            let keep = w.valid.min(capacity - delta);
            w.data.copy_within(0..keep, delta);
            let read = doc.read(new_base, &mut w.data[..delta]);
            if read < delta {
                // The document changed under us; nothing kept can be trusted.
                fill(&mut w, new_base, capacity, doc)
            } else {
                w.base = new_base;
                w.valid = delta + keep;
                Refill::Partial { read }
            }
        };
        debug!(base = new_base, valid = w.valid, ?refill, "viewport base moved");
        refill
    }

    /// Change the grid shape. The base stays put, so the existing prefix is
    /// kept and only the newly exposed suffix is read. On allocation failure
    /// the previous window is left untouched.
    pub fn resize<D: DocumentSource + ?Sized>(
        &mut self,
        rows: usize,
        columns: usize,
        doc: &D,
    ) -> EditResult<Refill> {
        let grid = Grid::new(rows, columns, self.group_request);
        let capacity = window_capacity(&grid, self.lookahead)?;
        if grid == self.grid {
            return Ok(Refill::Unchanged);
        }
        let mut data = allocate(capacity)?;

        let mut w = self.write_window();
        let keep = w.valid.min(capacity);
        data[..keep].copy_from_slice(&w.data[..keep]);
        let read = doc.read(w.base + keep, &mut data[keep..]);
        w.data = data;
        w.valid = keep + read;
        debug!(rows = grid.rows, columns = grid.columns, capacity, valid = w.valid, "viewport resized");
        drop(w);

        self.grid = grid;
        Ok(Refill::Partial { read })
    }

    /// Re-read the whole window. Needed after inserts and removals, which
    /// shift every byte downstream of the edit.
    pub fn rebuffer<D: DocumentSource + ?Sized>(&mut self, doc: &D) -> Refill {
        let capacity = self.capacity();
        let mut w = self.write_window();
        let base = w.base;
        let refill = fill(&mut w, base, capacity, doc);
        debug!(base, valid = w.valid, "viewport rebuffered");
        refill
    }

    /// A single byte changed in place.
    pub fn hint_byte_changed<D: DocumentSource + ?Sized>(&self, offset: usize, doc: &D) -> bool {
        self.hint_range_changed(offset, Some(offset.saturating_add(1)), doc)
    }

    /// Bytes in `[begin, end)` changed in place; `None` means through the end
    /// of the document. Only the part overlapping the window is re-read.
    /// Returns whether anything was refilled.
    pub fn hint_range_changed<D: DocumentSource + ?Sized>(
        &self,
        begin: usize,
        end: Option<usize>,
        doc: &D,
    ) -> bool {
        let capacity = self.capacity();
        let mut w = self.write_window();
        let window_end = w.base + w.valid;

        match end {
            Some(end) => {
                let lo = begin.max(w.base);
                let hi = end.min(window_end);
                if lo >= hi {
                    return false;
                }
                let start = lo - w.base;
                let len = hi - lo;
                let read = doc.read(lo, &mut w.data[start..start + len]);
                if read < len {
                    w.valid = start + read;
                }
                trace!(begin = lo, end = hi, read, "viewport hint refill");
            }
            None => {
                if begin > window_end {
                    return false;
                }
                let lo = begin.max(w.base);
                let start = lo - w.base;
                let read = doc.read(lo, &mut w.data[start..capacity]);
                w.valid = start + read;
                trace!(begin = lo, read, "viewport open-ended hint refill");
            }
        }
        true
    }
}

fn fill<D: DocumentSource + ?Sized>(w: &mut Window, base: usize, capacity: usize, doc: &D) -> Refill {
    let read = doc.read(base, &mut w.data[..capacity]);
    w.base = base;
    w.valid = read;
    Refill::Full { read }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::MemoryDocument;

    /// Counts how many bytes the viewport pulls from the document.
    struct CountingDocument {
        inner: MemoryDocument,
        bytes_read: Cell<usize>,
    }

    impl CountingDocument {
        fn new(size: usize) -> Self {
            Self {
                inner: MemoryDocument::new((0..size).map(|i| i as u8).collect()),
                bytes_read: Cell::new(0),
            }
        }

        fn take_count(&self) -> usize {
            self.bytes_read.replace(0)
        }
    }

    impl DocumentSource for CountingDocument {
        fn read(&self, offset: usize, buf: &mut [u8]) -> usize {
            let n = self.inner.read(offset, buf);
            self.bytes_read.set(self.bytes_read.get() + n);
            n
        }
        fn size(&self) -> usize {
            self.inner.size()
        }
        fn read_only(&self) -> bool {
            false
        }
        fn insert_byte(&mut self, offset: usize, value: u8) -> EditResult<()> {
            self.inner.insert_byte(offset, value)
        }
        fn overwrite_byte(&mut self, offset: usize, value: u8) -> EditResult<()> {
            self.inner.overwrite_byte(offset, value)
        }
        fn remove_range(&mut self, offset: usize, length: usize) -> EditResult<()> {
            self.inner.remove_range(offset, length)
        }
        fn replace_range(&mut self, offset: usize, old_length: usize, new_bytes: &[u8]) -> EditResult<()> {
            self.inner.replace_range(offset, old_length, new_bytes)
        }
    }

    fn expected(doc: &impl DocumentSource, base: usize, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        let n = doc.read(base, &mut buf);
        buf.truncate(n);
        buf
    }

    fn cache(doc: &impl DocumentSource) -> ViewportCache {
        let mut cache = ViewportCache::new(Grid::new(4, 16, 8), 3).unwrap();
        cache.rebuffer(doc);
        cache
    }

    #[test]
    fn sliding_by_one_reads_one_byte() {
        let doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        assert_eq!(cache.capacity(), 67);

        cache.set_base(20, &doc);
        doc.take_count();
        assert_eq!(cache.set_base(21, &doc), Refill::Partial { read: 1 });
        assert_eq!(doc.take_count(), 1);
        assert_eq!(cache.valid_len(), 67);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 21, 67).as_slice());
    }

    #[test]
    fn same_base_is_a_no_op() {
        let doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        doc.take_count();
        assert_eq!(cache.set_base(0, &doc), Refill::Unchanged);
        assert_eq!(doc.take_count(), 0);
    }

    #[test]
    fn scrolling_up_reads_only_the_head() {
        let doc = CountingDocument::new(200);
        let mut cache = cache(&doc);
        cache.set_base(64, &doc);
        doc.take_count();

        assert_eq!(cache.set_base(48, &doc), Refill::Partial { read: 16 });
        assert_eq!(doc.take_count(), 16);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 48, 67).as_slice());
    }

    #[test]
    fn disjoint_jump_is_a_full_read() {
        let doc = CountingDocument::new(500);
        let mut cache = cache(&doc);
        assert_eq!(cache.set_base(300, &doc), Refill::Full { read: 67 });
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 300, 67).as_slice());
    }

    #[test]
    fn short_read_near_end_truncates_valid_len() {
        let doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        cache.set_base(90, &doc);
        assert_eq!(cache.valid_len(), 10);
        cache.set_base(95, &doc);
        assert_eq!(cache.valid_len(), 5);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 95, 67).as_slice());

        cache.set_base(150, &doc);
        assert_eq!(cache.valid_len(), 0);
    }

    #[test]
    fn growing_resize_reads_only_the_suffix() {
        let doc = CountingDocument::new(1000);
        let mut cache = cache(&doc);
        cache.set_base(10, &doc);
        doc.take_count();

        assert_eq!(cache.resize(8, 16, &doc), Ok(Refill::Partial { read: 64 }));
        assert_eq!(doc.take_count(), 64);
        assert_eq!(cache.capacity(), 131);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 10, 131).as_slice());

        cache.resize(2, 8, &doc).unwrap();
        assert_eq!(cache.valid_len(), 19);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 10, 19).as_slice());
    }

    #[test]
    fn resize_restores_configured_grouping() {
        let doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        cache.resize(4, 12, &doc).unwrap();
        assert_eq!(cache.grid().group_size, 4);
        cache.resize(4, 16, &doc).unwrap();
        assert_eq!(cache.grid().group_size, 8);

        let mut odd = ViewportCache::new(Grid::new(4, 12, 8), 3)
            .unwrap()
            .with_group_size(8);
        assert_eq!(odd.grid().group_size, 4);
        odd.resize(4, 32, &doc).unwrap();
        assert_eq!(odd.grid().group_size, 8);
    }

    #[test]
    fn failed_resize_leaves_window_untouched() {
        let doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        cache.set_base(5, &doc);
        let before = cache.visible_bytes().to_vec();

        let err = cache.resize(usize::MAX, 2, &doc).unwrap_err();
        assert!(matches!(err, EditError::Allocation { .. }));
        assert_eq!(cache.grid(), Grid::new(4, 16, 8));
        assert_eq!(cache.base(), 5);
        assert_eq!(cache.visible_bytes().to_vec(), before);
    }

    #[test]
    fn hints_refill_only_the_window() {
        let mut doc = CountingDocument::new(100);
        let mut cache = cache(&doc);
        cache.set_base(10, &doc);

        doc.overwrite_byte(12, 0xEE).unwrap();
        doc.take_count();
        assert!(cache.hint_byte_changed(12, &doc));
        assert_eq!(doc.take_count(), 1);
        assert_eq!(cache.byte_at(12), Some(0xEE));

        doc.overwrite_byte(2, 0xEE).unwrap();
        assert!(!cache.hint_byte_changed(2, &doc));
        assert!(!cache.hint_range_changed(90, Some(99), &doc));
        assert_eq!(doc.take_count(), 0);
    }

    #[test]
    fn open_ended_hint_picks_up_appended_bytes() {
        let mut doc = CountingDocument::new(20);
        let mut cache = cache(&doc);
        assert_eq!(cache.valid_len(), 20);

        doc.insert_byte(20, 0xAB).unwrap();
        doc.insert_byte(21, 0xCD).unwrap();
        assert!(cache.hint_range_changed(20, None, &doc));
        assert_eq!(cache.valid_len(), 22);
        assert_eq!(&*cache.visible_bytes(), expected(&doc, 0, 67).as_slice());
    }

    #[test]
    fn background_hints_do_not_race_readers() {
        let doc = MemoryDocument::new(vec![7; 256]);
        let mut cache = ViewportCache::new(Grid::new(4, 16, 8), 3).unwrap();
        cache.rebuffer(&doc);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    cache.hint_range_changed(i % 64, Some(i % 64 + 4), &doc);
                }
            });
            for _ in 0..200 {
                let view = cache.visible_bytes();
                assert!(view.iter().all(|&b| b == 7));
            }
        });
    }
}
