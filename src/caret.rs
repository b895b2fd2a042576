//! The edit caret: byte offset, active pane and nibble sub-position.

/// The two parallel views of the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Hex,
    Text,
}

impl Pane {
    pub fn other(self) -> Self {
        match self {
            Pane::Hex => Pane::Text,
            Pane::Text => Pane::Hex,
        }
    }
}

/// Snapshot of the caret handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaretPosition {
    pub offset: usize,
    pub pane: Pane,
    /// The byte at `offset` has its upper nibble written and awaits the lower one.
    pub nibble_high: bool,
    /// Drawn past the last column of the previous row rather than at the
    /// start of the row `offset` belongs to.
    pub at_end_of_line: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Caret {
    pos: CaretPosition,
    visible: bool,
}

impl Caret {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> CaretPosition {
        self.pos
    }

    pub fn offset(&self) -> usize {
        self.pos.offset
    }

    pub fn pane(&self) -> Pane {
        self.pos.pane
    }

    pub fn nibble_high(&self) -> bool {
        self.pos.nibble_high
    }

    pub fn at_end_of_line(&self) -> bool {
        self.pos.at_end_of_line
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Move to `offset` clamped into `[0, size]`, dropping nibble and end-of-line state.
    pub fn move_to(&mut self, offset: usize, size: usize) {
        self.pos.offset = offset.min(size);
        self.pos.nibble_high = false;
        self.pos.at_end_of_line = false;
    }

    /// Like [`Caret::move_to`] but keeps a pending nibble.
    pub fn move_to_preserving_nibble(&mut self, offset: usize, size: usize) {
        let nibble = self.pos.nibble_high;
        self.move_to(offset, size);
        self.pos.nibble_high = nibble && self.pos.pane == Pane::Hex;
    }

    /// Mark the caret as sitting at the end of the previous row.
    /// Ignored at offset 0, which has no previous row.
    pub fn set_end_of_line(&mut self, eol: bool) {
        self.pos.at_end_of_line = eol && self.pos.offset > 0;
    }

    pub fn set_nibble_high(&mut self, nibble_high: bool) {
        self.pos.nibble_high = nibble_high && self.pos.pane == Pane::Hex;
    }

    /// Flip the pending nibble without moving. Only meaningful in the hex pane.
    pub fn toggle_nibble(&mut self) -> bool {
        if self.pos.pane != Pane::Hex {
            return false;
        }
        self.pos.nibble_high = !self.pos.nibble_high;
        true
    }

    pub fn switch_pane(&mut self, pane: Pane) {
        self.pos.pane = pane;
        self.pos.nibble_high = false;
    }

    /// Pull the offset back into `[0, size]` after the document shrank.
    pub fn clamp(&mut self, size: usize) {
        if self.pos.offset > size {
            self.pos.offset = size;
            self.pos.nibble_high = false;
            self.pos.at_end_of_line = false;
        }
    }

    /// Recompute visibility against a window of `page_len` bytes starting at `base`.
    pub fn update_visibility(&mut self, base: usize, page_len: usize) -> bool {
        let probe = self.display_offset();
        self.visible = probe >= base && probe < base + page_len;
        self.visible
    }

    /// The offset whose cell the caret is drawn against.
    pub fn display_offset(&self) -> usize {
        if self.pos.at_end_of_line {
            self.pos.offset - 1
        } else {
            self.pos.offset
        }
    }
}
