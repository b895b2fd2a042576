//! Toolkit-independent input intents.
//!
//! Hosts decode their own key and mouse events into these once, at the
//! boundary; the session consumes them without knowing where they came from.

/// Caret motions. Used plain (`Move`) or with selection extension (`Extend`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    LineStart,
    LineEnd,
    DocumentStart,
    DocumentEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIntent {
    /// A hex digit value, `0..=15`.
    HexDigit(u8),
    TextByte(u8),
    Move(Motion),
    Extend(Motion),
    Delete,
    Backspace,
    SwitchPane,
    ToggleInsertMode,
    SelectAll,
    /// Scroll the viewport by whole rows without moving the caret.
    Scroll(isize),
}

impl InputIntent {
    /// Decode a character typed into the hex pane.
    pub fn hex_digit(c: char) -> Option<Self> {
        c.to_digit(16).map(|d| InputIntent::HexDigit(d as u8))
    }

    /// Decode a character typed into the text pane. Only single-byte
    /// characters map to a byte.
    pub fn text_char(c: char) -> Option<Self> {
        u8::try_from(u32::from(c))
            .ok()
            .filter(|b| b.is_ascii() && !b.is_ascii_control())
            .map(InputIntent::TextByte)
    }
}
