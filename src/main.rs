use std::path::{Path, PathBuf};
use std::{env, io};

mod display;
mod editor;
mod logging;

use editor::HexEditor;
use hexpane::config::AppConfig;
use hexpane::document::MemoryDocument;

const CONFIG_FILE: &str = "hexpane.toml";

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    let read_only = args.iter().skip(1).any(|a| a == "--read-only");
    let Some(file) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: hexpane <file> [--read-only]");
        return Ok(());
    };

    let _log_guard = logging::init(&env::temp_dir());

    let path = PathBuf::from(file);
    let mut doc = match MemoryDocument::open(&path) {
        Ok(doc) => doc,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("{} does not exist, starting empty", path.display());
            MemoryDocument::new(Vec::new())
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file, e);
            return Ok(());
        }
    };
    if read_only {
        doc.set_read_only(true);
    }

    let config = AppConfig::load(Path::new(CONFIG_FILE));
    let mut editor = HexEditor::new(path, doc, config)?;
    editor.run()?;

    Ok(())
}
