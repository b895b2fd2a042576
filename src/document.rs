//! Byte-addressable document access.
//!
//! The core never stores the document itself: it reads through
//! [`DocumentSource`] and mutates through it. [`MemoryDocument`] is the
//! simple backing used by the terminal host and by tests.

use std::{fs, io, path::Path};

use crate::error::{EditError, EditResult};

/// A byte sequence the editing core can read from and mutate.
pub trait DocumentSource {
    /// Read up to `buf.len()` bytes starting at `offset`.
    /// Returns the number of bytes read; a short read means end of document.
    fn read(&self, offset: usize, buf: &mut [u8]) -> usize;

    fn size(&self) -> usize;

    fn read_only(&self) -> bool;

    fn insert_byte(&mut self, offset: usize, value: u8) -> EditResult<()>;

    fn overwrite_byte(&mut self, offset: usize, value: u8) -> EditResult<()>;

    fn remove_range(&mut self, offset: usize, length: usize) -> EditResult<()>;

    /// Replace `old_length` bytes at `offset` with `new_bytes`.
    fn replace_range(&mut self, offset: usize, old_length: usize, new_bytes: &[u8]) -> EditResult<()>;

    /// Read exactly `buf.len()` bytes, reporting a short read as an error.
    fn read_exact(&self, offset: usize, buf: &mut [u8]) -> EditResult<()> {
        let read = self.read(offset, buf);
        if read < buf.len() {
            return Err(EditError::ShortRead {
                offset,
                requested: buf.len(),
                read,
            });
        }
        Ok(())
    }
}

/// Whole-file document held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    bytes: Vec<u8>,
    read_only: bool,
    modified: bool,
}

impl MemoryDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            read_only: false,
            modified: false,
        }
    }

    pub fn new_read_only(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            read_only: true,
            modified: false,
        }
    }

    /// Load a file; the document is read-only when the file's permissions say so.
    pub fn open(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let read_only = fs::metadata(path)?.permissions().readonly();
        Ok(Self {
            bytes,
            read_only,
            modified: false,
        })
    }

    pub fn save(&mut self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.bytes)?;
        self.modified = false;
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn check_writable(&self) -> EditResult<()> {
        if self.read_only {
            Err(EditError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn check_range(&self, offset: usize, length: usize) -> EditResult<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(EditError::OutOfRange {
                offset,
                size: self.bytes.len(),
            }),
        }
    }
}

impl DocumentSource for MemoryDocument {
    fn read(&self, offset: usize, buf: &mut [u8]) -> usize {
        if offset >= self.bytes.len() {
            return 0;
        }
        let n = buf.len().min(self.bytes.len() - offset);
        buf[..n].copy_from_slice(&self.bytes[offset..offset + n]);
        n
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn insert_byte(&mut self, offset: usize, value: u8) -> EditResult<()> {
        self.check_writable()?;
        self.check_range(offset, 0)?;
        self.bytes.insert(offset, value);
        self.modified = true;
        Ok(())
    }

    fn overwrite_byte(&mut self, offset: usize, value: u8) -> EditResult<()> {
        self.check_writable()?;
        self.check_range(offset, 1)?;
        self.bytes[offset] = value;
        self.modified = true;
        Ok(())
    }

    fn remove_range(&mut self, offset: usize, length: usize) -> EditResult<()> {
        self.check_writable()?;
        self.check_range(offset, length)?;
        self.bytes.drain(offset..offset + length);
        self.modified = true;
        Ok(())
    }

    fn replace_range(&mut self, offset: usize, old_length: usize, new_bytes: &[u8]) -> EditResult<()> {
        self.check_writable()?;
        self.check_range(offset, old_length)?;
        self.bytes
            .splice(offset..offset + old_length, new_bytes.iter().copied());
        self.modified = true;
        Ok(())
    }
}
