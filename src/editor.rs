use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::queue;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use hexpane::caret::Pane;
use hexpane::config::AppConfig;
use hexpane::document::MemoryDocument;
use hexpane::error::{EditError, EditResult};
use hexpane::input::{InputIntent, Motion};
use hexpane::session::{EditorSession, SessionEvent};

use crate::display::{self, CHROME_LINES, DATA_TOP};

/// Rows scrolled per mouse wheel notch.
const WHEEL_ROWS: isize = 3;

/// What a key press asks the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Intent(InputIntent),
    ClearSelection,
    Save,
    Quit,
}

/// Decode a key press for the given active pane.
pub fn decode_key(key: KeyEvent, pane: Pane) -> Option<HostAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let motion = |m: Motion| {
        Some(HostAction::Intent(if shift {
            InputIntent::Extend(m)
        } else {
            InputIntent::Move(m)
        }))
    };

    match key.code {
        // FILE/MODE CONTROLS
        KeyCode::Char('q') if ctrl || alt => Some(HostAction::Quit),
        KeyCode::Char('s') if ctrl => Some(HostAction::Save),
        KeyCode::Char('a') if ctrl => Some(HostAction::Intent(InputIntent::SelectAll)),
        KeyCode::Tab | KeyCode::BackTab => Some(HostAction::Intent(InputIntent::SwitchPane)),
        KeyCode::Insert => Some(HostAction::Intent(InputIntent::ToggleInsertMode)),
        KeyCode::Esc => Some(HostAction::ClearSelection),

        // NAVIGATION CONTROLS
        KeyCode::Up => motion(Motion::Up),
        KeyCode::Down => motion(Motion::Down),
        KeyCode::Left => motion(Motion::Left),
        KeyCode::Right => motion(Motion::Right),
        KeyCode::PageUp => motion(Motion::PageUp),
        KeyCode::PageDown => motion(Motion::PageDown),
        KeyCode::Home if ctrl => motion(Motion::DocumentStart),
        KeyCode::End if ctrl => motion(Motion::DocumentEnd),
        KeyCode::Home => motion(Motion::LineStart),
        KeyCode::End => motion(Motion::LineEnd),

        // EDITING CONTROLS
        KeyCode::Delete => Some(HostAction::Intent(InputIntent::Delete)),
        KeyCode::Backspace => Some(HostAction::Intent(InputIntent::Backspace)),
        KeyCode::Char(c) if !ctrl && !alt => match pane {
            Pane::Hex => InputIntent::hex_digit(c),
            Pane::Text => InputIntent::text_char(c),
        }
        .map(HostAction::Intent),
        _ => None,
    }
}

pub struct HexEditor {
    pub session: EditorSession<MemoryDocument>,
    pub path: PathBuf,
    pub config: AppConfig,
    pub message: Option<String>,
    dirty_rows: Vec<bool>,
    full_redraw: bool,
    caret_row: Option<usize>,
}

/// Grid shape for a terminal of `width` x `height` cells.
fn grid_shape(config: &AppConfig, width: u16, height: u16) -> (usize, usize) {
    let rows = usize::from(height.saturating_sub(CHROME_LINES)).max(1);
    let mut columns = display::fit_width(usize::from(width), config.layout.group_size.max(1));
    if config.layout.max_columns > 0 {
        columns = columns.min(config.layout.max_columns);
    }
    (rows, columns)
}

impl HexEditor {
    pub fn new(path: PathBuf, doc: MemoryDocument, config: AppConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let (rows, columns) = grid_shape(&config, width, height);
        let session = EditorSession::new(doc, config.session_config(rows, columns))
            .map_err(io::Error::other)?;

        Ok(Self {
            session,
            path,
            config,
            message: None,
            dirty_rows: vec![false; rows],
            full_redraw: true,
            caret_row: None,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), terminal::Clear(ClearType::All))?;

        let result = self.event_loop();

        terminal::disable_raw_mode()?;
        execute!(io::stdout(), cursor::Show, DisableMouseCapture, LeaveAlternateScreen)?;
        result
    }

    fn event_loop(&mut self) -> io::Result<()> {
        let interval = Duration::from_millis(self.config.autoscroll.interval_ms.max(1));
        let mut last_tick = Instant::now();

        loop {
            self.collect_session_events();
            display::draw(self)?;

            let event = if self.session.autoscroll_active() {
                if event::poll(interval)? { Some(event::read()?) } else { None }
            } else {
                Some(event::read()?)
            };

            match event {
                Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if self.handle_key_event(key)? {
                        break;
                    }
                }
                Some(Event::Mouse(mouse)) => self.handle_mouse_event(mouse),
                Some(Event::Resize(width, height)) => self.relayout(width, height),
                _ => {}
            }

            if self.session.autoscroll_active() && last_tick.elapsed() >= interval {
                self.session.autoscroll_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> io::Result<bool> {
        self.message = None;
        let Some(action) = decode_key(key, self.session.caret().pane) else {
            return Ok(false);
        };
        match action {
            HostAction::Quit => {
                if !self.session.document().is_modified() {
                    return Ok(true);
                }
                if let Some(ans) = self.prompt("File modified. Save before exit? (y/n/c): ")? {
                    match ans {
                        'y' => {
                            self.save()?;
                            return Ok(true);
                        }
                        'n' => return Ok(true),
                        _ => {}
                    }
                }
            }
            HostAction::Save if self.session.document().is_modified() => {
                if let Some('y') = self.prompt("Really save changes? (y/n): ")? {
                    self.save()?;
                }
            }
            HostAction::Save => {}
            HostAction::ClearSelection => self.session.clear_selection(),
            HostAction::Intent(intent) => {
                let result = self.session.apply(intent);
                self.report(result);
            }
        }
        Ok(false)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        let grid = self.session.grid();
        let y = i32::from(mouse.row) - i32::from(DATA_TOP);
        let row = usize::try_from(y).unwrap_or(0).min(grid.rows - 1);
        let cell = display::screen_to_cell(&grid, usize::from(mouse.column));

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if y < 0 {
                    return;
                }
                let extend = mouse.modifiers.contains(KeyModifiers::SHIFT);
                self.session.begin_drag_at(row, cell, extend);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.session.drag_to(row, cell);
                let height = i32::try_from(grid.rows).unwrap_or(i32::MAX);
                self.session.track_pointer(y, height);
            }
            MouseEventKind::Up(MouseButton::Left) => self.session.end_drag(),
            MouseEventKind::ScrollUp => self.session.scroll_rows(-WHEEL_ROWS),
            MouseEventKind::ScrollDown => self.session.scroll_rows(WHEEL_ROWS),
            _ => {}
        }
    }

    fn relayout(&mut self, width: u16, height: u16) {
        let (rows, columns) = grid_shape(&self.config, width, height);
        if let Err(e) = self.session.resize_viewport(rows, columns) {
            self.report(Err(e));
            return;
        }
        self.session.scroll_to_caret();
        self.dirty_rows = vec![false; rows];
        self.full_redraw = true;
    }

    fn report(&mut self, result: EditResult<()>) {
        match result {
            Ok(()) => {}
            Err(e @ EditError::ReadOnly) | Err(e @ EditError::Allocation { .. }) => {
                self.message = Some(e.to_string());
            }
            Err(e) => tracing::debug!("edit not applied: {}", e),
        }
    }

    /// Fold session notifications into the set of rows to repaint.
    fn collect_session_events(&mut self) {
        let rows = self.session.grid().rows;
        if self.dirty_rows.len() != rows {
            self.dirty_rows = vec![false; rows];
            self.full_redraw = true;
        }
        for event in self.session.take_events() {
            match event {
                SessionEvent::RowsDirty(range) => {
                    for row in range.filter(|&r| r < rows) {
                        self.dirty_rows[row] = true;
                    }
                }
                SessionEvent::CaretMoved(_) | SessionEvent::SelectionChanged(_) => {}
            }
        }

        // The caret highlight moves between rows without any bytes changing.
        let grid = self.session.grid();
        let caret = self.session.caret();
        let probe = if caret.at_end_of_line { caret.offset - 1 } else { caret.offset };
        let now = grid
            .row_of(probe, self.session.base())
            .filter(|&r| r < rows);
        if now != self.caret_row {
            for row in [self.caret_row, now].into_iter().flatten() {
                self.dirty_rows[row] = true;
            }
            self.caret_row = now;
        } else if let Some(row) = now {
            self.dirty_rows[row] = true;
        }
    }

    pub fn take_dirty_rows(&mut self) -> Vec<bool> {
        let rows = self.dirty_rows.len();
        std::mem::replace(&mut self.dirty_rows, vec![false; rows])
    }

    pub fn take_full_redraw(&mut self) -> bool {
        std::mem::take(&mut self.full_redraw)
    }

    fn prompt(&mut self, message: &str) -> io::Result<Option<char>> {
        let mut stdout = io::stdout();
        let line = DATA_TOP + self.session.grid().rows as u16;
        queue!(stdout, cursor::MoveTo(0, line))?;
        queue!(stdout, terminal::Clear(ClearType::CurrentLine))?;
        write!(stdout, "{}", message)?;
        stdout.flush()?;
        loop {
            if let Event::Key(key) = event::read()? {
                // Only PRESS events, so the release of the key that opened the prompt is ignored
                if key.kind == KeyEventKind::Press {
                    if let KeyCode::Char(c) = key.code {
                        return Ok(Some(c.to_ascii_lowercase()));
                    } else if key.code == KeyCode::Esc {
                        return Ok(Some('c')); // Treat Esc as cancel
                    }
                }
            }
        }
    }

    fn save(&mut self) -> io::Result<()> {
        self.session.document_mut().save(&self.path)?;
        self.message = Some(format!("Saved {}", self.path.display()));
        Ok(())
    }
}
