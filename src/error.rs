//! Error types for the editing core.

use thiserror::Error;

/// Errors produced by document access, viewport resizing and edit commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A mutation was attempted on a read-only document
    #[error("Document is read-only")]
    ReadOnly,

    /// An offset outside the document was passed where it cannot be clamped
    #[error("Offset {offset} is out of range (document size {size})")]
    OutOfRange { offset: usize, size: usize },

    /// The document returned fewer bytes than requested
    #[error("Short read at {offset}: requested {requested} bytes, got {read}")]
    ShortRead {
        offset: usize,
        requested: usize,
        read: usize,
    },

    /// The viewport buffer could not be grown
    #[error("Failed to allocate a {bytes}-byte viewport buffer")]
    Allocation { bytes: usize },
}

pub type EditResult<T> = Result<T, EditError>;
