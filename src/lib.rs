//! Editing core for a two-pane hex editor.
//!
//! The crate is host-agnostic: it knows nothing about terminals or
//! windows. A host translates raw input into [`input::InputIntent`]s and
//! pointer cells, feeds them to an [`session::EditorSession`], and paints
//! from the session's viewport window.

pub mod caret;
pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod grid;
pub mod input;
pub mod selection;
pub mod session;
pub mod viewport;

pub use document::{DocumentSource, MemoryDocument};
pub use error::{EditError, EditResult};
pub use session::{EditorSession, SessionConfig, SessionEvent};
