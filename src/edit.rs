//! Edit commands as document mutations plus caret transitions.
//!
//! Every command checks writability before touching anything, so a failed
//! edit leaves the document, the window and the caret exactly as they were.

use tracing::{debug, warn};

use crate::caret::{Caret, Pane};
use crate::document::DocumentSource;
use crate::error::{EditError, EditResult};
use crate::selection::SelectionRange;
use crate::viewport::ViewportCache;

/// What an edit did to the document, for repaint purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    None,
    /// One byte replaced in place.
    InPlace(usize),
    /// Bytes inserted or removed at this offset; everything after it moved.
    Structural(usize),
}

#[derive(Debug, Clone, Default)]
pub struct EditEngine {
    insert_mode: bool,
}

fn ensure_writable<D: DocumentSource + ?Sized>(doc: &D) -> EditResult<()> {
    if doc.read_only() {
        warn!("edit rejected: document is read-only");
        return Err(EditError::ReadOnly);
    }
    Ok(())
}

fn read_byte<D: DocumentSource + ?Sized>(doc: &D, offset: usize) -> EditResult<u8> {
    let mut byte = [0u8; 1];
    doc.read_exact(offset, &mut byte)?;
    Ok(byte[0])
}

impl EditEngine {
    pub fn new(insert_mode: bool) -> Self {
        Self { insert_mode }
    }

    pub fn insert_mode(&self) -> bool {
        self.insert_mode
    }

    pub fn set_insert_mode(&mut self, insert_mode: bool) {
        self.insert_mode = insert_mode;
    }

    pub fn insert_byte<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        offset: usize,
        value: u8,
    ) -> EditResult<Change> {
        ensure_writable(&*doc)?;
        let size = doc.size();
        if offset > size {
            return Err(EditError::OutOfRange { offset, size });
        }
        doc.insert_byte(offset, value)?;
        viewport.rebuffer(&*doc);
        debug!(offset, value, "inserted byte");
        Ok(Change::Structural(offset))
    }

    pub fn overwrite_byte<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &ViewportCache,
        offset: usize,
        value: u8,
    ) -> EditResult<Change> {
        ensure_writable(&*doc)?;
        let size = doc.size();
        if offset >= size {
            return Err(EditError::OutOfRange { offset, size });
        }
        doc.overwrite_byte(offset, value)?;
        viewport.hint_byte_changed(offset, &*doc);
        Ok(Change::InPlace(offset))
    }

    pub fn remove_range<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        offset: usize,
        length: usize,
    ) -> EditResult<Change> {
        ensure_writable(&*doc)?;
        if length == 0 {
            return Ok(Change::None);
        }
        doc.remove_range(offset, length)?;
        viewport.rebuffer(&*doc);
        debug!(offset, length, "removed range");
        Ok(Change::Structural(offset))
    }

    /// Feed one hex digit (0..=15) typed in the hex pane.
    pub fn hex_digit<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        caret: &mut Caret,
        digit: u8,
    ) -> EditResult<Change> {
        if digit > 0x0F || caret.pane() != Pane::Hex {
            return Ok(Change::None);
        }
        let offset = caret.offset();
        let size = doc.size();

        if caret.nibble_high() && offset < size {
            // Complete the byte whose high nibble is already written.
            let current = read_byte(&*doc, offset)?;
            let change = self.overwrite_byte(doc, viewport, offset, (current & 0xF0) | digit)?;
            caret.move_to(offset + 1, doc.size());
            return Ok(change);
        }

        let change = if self.insert_mode || offset >= size {
            self.insert_byte(doc, viewport, offset, digit << 4)?
        } else {
            let current = read_byte(&*doc, offset)?;
            self.overwrite_byte(doc, viewport, offset, (current & 0x0F) | (digit << 4))?
        };
        caret.move_to(offset, doc.size());
        caret.set_nibble_high(true);
        Ok(change)
    }

    /// Feed one whole byte typed in the text pane.
    pub fn text_byte<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        caret: &mut Caret,
        value: u8,
    ) -> EditResult<Change> {
        let offset = caret.offset();
        let change = if self.insert_mode || offset >= doc.size() {
            self.insert_byte(doc, viewport, offset, value)?
        } else {
            self.overwrite_byte(doc, viewport, offset, value)?
        };
        caret.move_to(offset + 1, doc.size());
        Ok(change)
    }

    pub fn backspace<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        caret: &mut Caret,
        selection: Option<SelectionRange>,
    ) -> EditResult<Change> {
        if let Some(sel) = selection.filter(|s| s.length > 0) {
            return self.remove_selection(doc, viewport, caret, sel);
        }
        let offset = caret.offset();
        if caret.nibble_high() && offset < doc.size() {
            // The byte under the caret was only half entered: drop it.
            let change = self.remove_range(doc, viewport, offset, 1)?;
            caret.move_to(offset, doc.size());
            return Ok(change);
        }
        if offset == 0 {
            return Ok(Change::None);
        }
        let change = self.remove_range(doc, viewport, offset - 1, 1)?;
        caret.move_to(offset - 1, doc.size());
        Ok(change)
    }

    pub fn delete<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        caret: &mut Caret,
        selection: Option<SelectionRange>,
    ) -> EditResult<Change> {
        if let Some(sel) = selection.filter(|s| s.length > 0) {
            return self.remove_selection(doc, viewport, caret, sel);
        }
        let offset = caret.offset();
        if offset >= doc.size() {
            return Ok(Change::None);
        }
        let change = self.remove_range(doc, viewport, offset, 1)?;
        caret.move_to(offset, doc.size());
        Ok(change)
    }

    fn remove_selection<D: DocumentSource + ?Sized>(
        &self,
        doc: &mut D,
        viewport: &mut ViewportCache,
        caret: &mut Caret,
        sel: SelectionRange,
    ) -> EditResult<Change> {
        let change = self.remove_range(doc, viewport, sel.start, sel.length)?;
        caret.move_to(sel.start, doc.size());
        Ok(change)
    }
}
