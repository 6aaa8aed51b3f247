//! Read-only memory mapping of container files.

use crate::error::{Result, TrajectoryError};
use std::fs::File;
use std::path::Path;

/// A read-only memory-mapped file.
///
/// The mapping assumes a single writer: files are only ever replaced by an
/// atomic rename, never truncated in place.
#[derive(Debug)]
pub struct MappedFile {
    mmap: memmap2::Mmap,
    path: String,
}

#[allow(unsafe_code)]
impl MappedFile {
    /// Open a file for memory-mapped read access.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the file does not exist, `Io` otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TrajectoryError::missing(None, path),
            _ => TrajectoryError::Io(e),
        })?;

        // SAFETY: the file is opened read-only and writers replace files by
        // rename, so the mapped inode is never truncated underneath us.
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };

        Ok(Self {
            mmap,
            path: path_str,
        })
    }

    /// The whole file as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Bytes in `start..end`, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Option<&[u8]> {
        if start > end || end > self.mmap.len() {
            return None;
        }
        Some(&self.mmap[start..end])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}
