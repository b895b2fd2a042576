//! Terminal rendering of the session's visible window.
//!
//! Screen layout: status line, column header, then one line per grid row:
//! `oooooooo: xx xx .. xx  xx ..  text`. Column positions here are the
//! only place that knows about the extra space between hex groups; mouse
//! hits are converted back to grid cells with [`screen_to_cell`].

use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType},
};

use hexpane::caret::Pane;
use hexpane::config::ColorConfig;
use hexpane::grid::{Grid, HEX_SUB_CELLS, PANE_SEPARATOR_CELLS};

use crate::editor::HexEditor;

/// Width of the `oooooooo: ` offset gutter.
pub const GUTTER: usize = 10;
/// Screen line of the first grid row.
pub const DATA_TOP: u16 = 2;
/// Lines used by status, header and message line.
pub const CHROME_LINES: u16 = 3;

fn group_count(grid: &Grid) -> usize {
    grid.columns / grid.group_size
}

/// Screen x of the first text-pane column.
pub fn text_x(grid: &Grid) -> usize {
    // Last group has no extra gap; one separator space precedes the text.
    GUTTER + grid.columns * HEX_SUB_CELLS + group_count(grid)
}

/// Map a screen column to a grid hit cell.
pub fn screen_to_cell(grid: &Grid, x: usize) -> usize {
    let text_start = text_x(grid);
    let hex_cells = grid.columns * HEX_SUB_CELLS;
    if x >= text_start {
        return hex_cells + PANE_SEPARATOR_CELLS + (x - text_start);
    }
    let rel = x.saturating_sub(GUTTER);
    let group_width = grid.group_size * HEX_SUB_CELLS + 1;
    let group = rel / group_width;
    let within = rel % group_width;
    if group >= group_count(grid) {
        return hex_cells;
    }
    if within == grid.group_size * HEX_SUB_CELLS {
        if group + 1 == group_count(grid) {
            return hex_cells;
        }
        // Extra gap after a group: the trailing gap of the group's last byte.
        return (group * grid.group_size + grid.group_size - 1) * HEX_SUB_CELLS + 2;
    }
    group * grid.group_size * HEX_SUB_CELLS + within
}

/// Columns that fit a terminal `width` cells wide.
pub fn fit_width(width: usize, group: usize) -> usize {
    // Each group of g bytes costs 4g + 1 cells: hex digits, spacing, text.
    let budget = width.saturating_sub(GUTTER) * group;
    hexpane::grid::fit_columns(budget, 4 * group + 1, group)
}

pub fn draw(editor: &mut HexEditor) -> io::Result<()> {
    let mut stdout = io::stdout();
    let full = editor.take_full_redraw();
    let dirty = editor.take_dirty_rows();

    queue!(stdout, cursor::MoveTo(0, 0))?;
    draw_status_line(&mut stdout, editor)?;

    let grid = editor.session.grid();
    if full {
        queue!(stdout, cursor::MoveTo(0, 1))?;
        draw_header(&mut stdout, &grid, &editor.config.colors)?;
    }
    for row in 0..grid.rows {
        if full || dirty.get(row).copied().unwrap_or(false) {
            queue!(stdout, cursor::MoveTo(0, DATA_TOP + row as u16))?;
            draw_line(&mut stdout, editor, row)?;
        }
    }

    queue!(stdout, cursor::MoveTo(0, DATA_TOP + grid.rows as u16))?;
    queue!(stdout, terminal::Clear(ClearType::CurrentLine))?;
    if let Some(message) = &editor.message {
        write!(stdout, "{}", message)?;
    }
    stdout.flush()
}

fn draw_status_line<W: Write>(stdout: &mut W, editor: &HexEditor) -> io::Result<()> {
    let session = &editor.session;
    let colors = &editor.config.colors;
    let size = session.size();
    let caret = session.caret();
    let percent = if size > 0 {
        (caret.offset as f64 / size as f64) * 100.0
    } else {
        0.0
    };
    let mode = if session.insert_mode() { "INS" } else { "OVR" };
    let pane = match caret.pane {
        Pane::Hex => "HEX",
        Pane::Text => "TEXT",
    };
    let read_only = if hexpane::document::DocumentSource::read_only(session.document()) {
        " | RO"
    } else {
        ""
    };
    let modified = if session.document().is_modified() { "*" } else { "" };
    let selection = match session.selection().filter(|s| s.length > 0) {
        Some(s) => format!(" | sel {:08x}+{}", s.start, s.length),
        None => String::new(),
    };

    queue!(
        stdout,
        SetBackgroundColor(Color::AnsiValue(colors.status_bg)),
        SetForegroundColor(Color::AnsiValue(colors.status_fg))
    )?;
    write!(
        stdout,
        "{}{} ({} bytes) | {:08x} {:.1}% | {} {}{}{} | Tab: pane | Ins: mode | ^S: save | ^Q: quit",
        editor.path.display(),
        modified,
        size,
        caret.offset,
        percent,
        pane,
        mode,
        read_only,
        selection
    )?;
    queue!(stdout, terminal::Clear(ClearType::UntilNewLine), ResetColor)?;
    Ok(())
}

fn draw_header<W: Write>(stdout: &mut W, grid: &Grid, colors: &ColorConfig) -> io::Result<()> {
    queue!(stdout, SetForegroundColor(Color::AnsiValue(colors.header_fg)))?;
    write!(stdout, "{:width$}", "Offset", width = GUTTER)?;
    for i in 0..grid.columns {
        if i > 0 && i % grid.group_size == 0 {
            write!(stdout, " ")?;
        }
        write!(stdout, "{:02x} ", i)?;
    }
    write!(stdout, " Text")?;
    queue!(stdout, terminal::Clear(ClearType::UntilNewLine), ResetColor)?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellStyle {
    CaretActive,
    CaretInactive,
    Selected,
    Plain(u8),
}

fn byte_fg(colors: &ColorConfig, byte: u8) -> u8 {
    if byte == 0 {
        colors.null_fg
    } else if byte.is_ascii_graphic() || byte == b' ' {
        colors.printable_fg
    } else {
        colors.control_fg
    }
}

fn apply_style<W: Write>(stdout: &mut W, colors: &ColorConfig, style: CellStyle) -> io::Result<()> {
    match style {
        CellStyle::CaretActive => queue!(
            stdout,
            SetBackgroundColor(Color::AnsiValue(colors.cursor_active_bg)),
            SetForegroundColor(Color::AnsiValue(colors.cursor_active_fg))
        ),
        CellStyle::CaretInactive => queue!(
            stdout,
            SetBackgroundColor(Color::AnsiValue(colors.cursor_inactive_bg)),
            SetForegroundColor(Color::AnsiValue(colors.cursor_inactive_fg))
        ),
        CellStyle::Selected => queue!(
            stdout,
            SetBackgroundColor(Color::AnsiValue(colors.selection_bg)),
            SetForegroundColor(Color::AnsiValue(colors.selection_fg))
        ),
        CellStyle::Plain(fg) => queue!(stdout, SetForegroundColor(Color::AnsiValue(fg))),
    }
}

fn draw_line<W: Write>(stdout: &mut W, editor: &HexEditor, row: usize) -> io::Result<()> {
    let session = &editor.session;
    let colors = &editor.config.colors;
    let grid = session.grid();
    let caret = session.caret();
    let selection = session.selection().filter(|s| s.length > 0);
    let size = session.size();
    let view = session.visible_bytes();
    let line_start = grid.row_start(row, view.base());

    queue!(stdout, terminal::Clear(ClearType::CurrentLine))?;
    if line_start > size || (line_start == size && caret.offset != size) {
        return Ok(());
    }
    write!(stdout, "{:08x}: ", line_start)?;

    let byte_at = |column: usize| view.get(row * grid.columns + column).copied();
    let style_for = |pos: usize, byte: Option<u8>, pane: Pane| {
        if pos == caret.offset && !caret.at_end_of_line {
            if caret.pane == pane {
                CellStyle::CaretActive
            } else {
                CellStyle::CaretInactive
            }
        } else if selection.is_some_and(|s| s.contains(pos)) {
            CellStyle::Selected
        } else {
            CellStyle::Plain(byte.map_or(colors.null_fg, |b| byte_fg(colors, b)))
        }
    };

    for column in 0..grid.columns {
        if column > 0 && column % grid.group_size == 0 {
            write!(stdout, " ")?;
        }
        let pos = line_start + column;
        let byte = byte_at(column);
        match byte {
            Some(b) => {
                let style = style_for(pos, byte, Pane::Hex);
                if style == CellStyle::CaretActive && caret.nibble_high {
                    // High nibble written; highlight the pending low nibble.
                    apply_style(stdout, colors, CellStyle::Plain(byte_fg(colors, b)))?;
                    write!(stdout, "{:x}", b >> 4)?;
                    apply_style(stdout, colors, style)?;
                    write!(stdout, "{:x}", b & 0x0F)?;
                } else {
                    apply_style(stdout, colors, style)?;
                    write!(stdout, "{:02x}", b)?;
                }
            }
            None if pos == size && caret.offset == size && !caret.at_end_of_line => {
                apply_style(stdout, colors, style_for(pos, None, Pane::Hex))?;
                write!(stdout, "__")?;
            }
            None => write!(stdout, "  ")?,
        }
        queue!(stdout, ResetColor)?;

        let eol_here = caret.at_end_of_line && pos + 1 == caret.offset;
        if eol_here && caret.pane == Pane::Hex {
            apply_style(stdout, colors, CellStyle::CaretActive)?;
            write!(stdout, " ")?;
            queue!(stdout, ResetColor)?;
        } else {
            write!(stdout, " ")?;
        }
    }
    write!(stdout, " ")?;

    for column in 0..grid.columns {
        let pos = line_start + column;
        match byte_at(column) {
            Some(b) => {
                let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
                apply_style(stdout, colors, style_for(pos, Some(b), Pane::Text))?;
                write!(stdout, "{}", c)?;
                queue!(stdout, ResetColor)?;
            }
            None if pos == size && caret.offset == size && !caret.at_end_of_line => {
                apply_style(stdout, colors, style_for(pos, None, Pane::Text))?;
                write!(stdout, " ")?;
                queue!(stdout, ResetColor)?;
            }
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(4, 16, 8)
    }

    /// Screen x of byte `column`'s high-nibble digit, as `draw_line` lays it out.
    fn hex_x(grid: &Grid, column: usize) -> usize {
        GUTTER + column * HEX_SUB_CELLS + column / grid.group_size
    }

    #[test]
    fn hex_positions_include_group_gap() {
        let g = grid();
        assert_eq!(hex_x(&g, 0), GUTTER);
        assert_eq!(hex_x(&g, 7), GUTTER + 21);
        assert_eq!(hex_x(&g, 8), GUTTER + 25);
        assert_eq!(text_x(&g), GUTTER + 50);
    }

    #[test]
    fn screen_columns_map_back_to_cells() {
        let g = grid();
        for column in 0..g.columns {
            let x = hex_x(&g, column);
            assert_eq!(screen_to_cell(&g, x), column * 3);
            assert_eq!(screen_to_cell(&g, x + 1), column * 3 + 1);
            assert_eq!(screen_to_cell(&g, x + 2), column * 3 + 2);
        }
        // Extra group gap after byte 7 belongs to its trailing gap.
        assert_eq!(screen_to_cell(&g, GUTTER + 24), 7 * 3 + 2);
        // Separator before the text pane.
        assert_eq!(screen_to_cell(&g, GUTTER + 49), 48);
        assert_eq!(screen_to_cell(&g, text_x(&g) + 2), 48 + 1 + 2);
    }

    #[test]
    fn width_fit() {
        assert_eq!(fit_width(80, 8), 16);
        assert_eq!(fit_width(40, 8), 8);
        assert_eq!(fit_width(300, 8), hexpane::grid::MAX_COLUMNS);
    }
}
