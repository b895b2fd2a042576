//! User configuration loaded from a TOML file.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::session::{AutoScrollSettings, SessionConfig};
use crate::viewport::DEFAULT_LOOKAHEAD;

pub const DEFAULT_TOML: &str = r#"# All color values below are ANSI 256-color codes (0-255).
# See: https://www.ditig.com/256-colors-cheat-sheet

[colors]
status_bg = 15
status_fg = 0
header_fg = 51
cursor_active_bg = 226
cursor_active_fg = 16
cursor_inactive_bg = 240
cursor_inactive_fg = 15
selection_bg = 24
selection_fg = 15
null_fg = 242
control_fg = 33
printable_fg = 34

[layout]
# Bytes per visual group in the hex pane; rounded down to a power of two.
group_size = 8
# Upper bound for bytes per row; 0 fits the terminal width.
max_columns = 0
lookahead = 3

[editing]
insert_mode = false

[autoscroll]
# Rows from the top/bottom edge where dragging starts scrolling.
threshold = 2
line_height = 1
tuning = 4
interval_ms = 50
"#;

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ColorConfig {
    pub status_bg: u8,
    pub status_fg: u8,
    pub header_fg: u8,
    pub cursor_active_bg: u8,
    pub cursor_active_fg: u8,
    pub cursor_inactive_bg: u8,
    pub cursor_inactive_fg: u8,
    pub selection_bg: u8,
    pub selection_fg: u8,
    pub null_fg: u8,
    pub control_fg: u8,
    pub printable_fg: u8,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            status_bg: 15,
            status_fg: 0,
            header_fg: 51,
            cursor_active_bg: 226,
            cursor_active_fg: 16,
            cursor_inactive_bg: 240,
            cursor_inactive_fg: 15,
            selection_bg: 24,
            selection_fg: 15,
            null_fg: 242,
            control_fg: 33,
            printable_fg: 34,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub group_size: usize,
    pub max_columns: usize,
    pub lookahead: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            group_size: 8,
            max_columns: 0,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EditingConfig {
    pub insert_mode: bool,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AutoScrollConfig {
    pub threshold: i32,
    pub line_height: i32,
    pub tuning: i32,
    pub interval_ms: u64,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        let core = AutoScrollSettings::default();
        Self {
            threshold: core.threshold,
            line_height: core.line_height,
            tuning: core.tuning,
            interval_ms: 50,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub colors: ColorConfig,
    pub layout: LayoutConfig,
    pub editing: EditingConfig,
    pub autoscroll: AutoScrollConfig,
}

impl AppConfig {
    /// Load `path`, writing the default file first if it does not exist.
    /// Unreadable or invalid files fall back to the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            if let Err(e) = fs::write(path, DEFAULT_TOML) {
                tracing::warn!("Could not write default config to {}: {}", path.display(), e);
            }
        }
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s).unwrap_or_else(|e| {
                tracing::warn!("Invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Session settings for a grid of `rows` x `columns`.
    pub fn session_config(&self, rows: usize, columns: usize) -> SessionConfig {
        SessionConfig {
            rows,
            columns,
            group_size: self.layout.group_size,
            lookahead: self.layout.lookahead,
            insert_mode: self.editing.insert_mode,
            autoscroll: AutoScrollSettings {
                threshold: self.autoscroll.threshold,
                line_height: self.autoscroll.line_height,
                tuning: self.autoscroll.tuning,
            },
        }
    }
}
