//! The backend provider trait.

use aqlink_types::{DirEntry, DirFlags, FileStat, OpenFlags, SeekWhence, VfsError, VfsResult};
use async_trait::async_trait;

/// Abstract storage provider interface.
///
/// All paths are backend-local: already resolved, `/`-separated, with no
/// leading separator and no `.`/`..` components. The empty string is the
/// backend root.
///
/// File handles (`fd`) are backend-local small integers; the multiplexer
/// pairs them with the owning backend, so values only need to be unique
/// within one backend.
///
/// Every method has a default body returning [`VfsError::Other`], so a
/// provider implements only what it supports — the ROM archive, for
/// example, never implements `write`, `rename`, `mkdir`, or `delete`.
#[async_trait]
pub trait VfsBackend: Send + Sync {
    /// Open a file, returning a backend-local handle.
    async fn open(&self, flags: OpenFlags, path: &str) -> VfsResult<u8> {
        let _ = (flags, path);
        Err(VfsError::Other)
    }

    /// Close a backend-local handle.
    async fn close(&self, fd: u8) -> VfsResult<()> {
        let _ = fd;
        Err(VfsError::Other)
    }

    /// Read up to `size` bytes. An empty result means end of file.
    async fn read(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let _ = (fd, size);
        Err(VfsError::Other)
    }

    /// Read one line, up to `size` bytes, including any trailing newline.
    ///
    /// Fails with [`VfsError::EndOfFile`] when the cursor is already at the
    /// end of the file.
    async fn read_line(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let _ = (fd, size);
        Err(VfsError::Other)
    }

    /// Write `data`, returning the number of bytes written.
    async fn write(&self, fd: u8, data: &[u8]) -> VfsResult<usize> {
        let _ = (fd, data);
        Err(VfsError::Other)
    }

    /// Seek to an absolute offset.
    async fn seek(&self, fd: u8, offset: u32) -> VfsResult<()> {
        let _ = (fd, offset);
        Err(VfsError::Other)
    }

    /// Whence-based seek, returning the new absolute offset.
    ///
    /// Offsets that would land before the start of the file clamp to 0.
    async fn lseek(&self, fd: u8, offset: i32, whence: SeekWhence) -> VfsResult<u32> {
        let _ = (fd, offset, whence);
        Err(VfsError::Other)
    }

    /// Current file offset.
    async fn tell(&self, fd: u8) -> VfsResult<u32> {
        let _ = fd;
        Err(VfsError::Other)
    }

    /// Enumerate a directory: unsorted, unfiltered by wildcard.
    ///
    /// Backends honor [`DirFlags::HIDDEN`] (hidden-file suppression) and may
    /// refuse [`DirFlags::MODE83`] with [`VfsError::InvalidParam`]. The
    /// `..` synthesis, wildcard filtering, and sorting happen in the
    /// multiplexer, on the snapshot this returns.
    async fn enumerate(&self, path: &str, flags: DirFlags) -> VfsResult<Vec<DirEntry>> {
        let _ = (path, flags);
        Err(VfsError::Other)
    }

    /// Delete a file or empty directory.
    async fn delete(&self, path: &str) -> VfsResult<()> {
        let _ = path;
        Err(VfsError::Other)
    }

    /// Rename within this backend. Cross-backend renames never reach here.
    async fn rename(&self, old_path: &str, new_path: &str) -> VfsResult<()> {
        let _ = (old_path, new_path);
        Err(VfsError::Other)
    }

    /// Create a directory.
    async fn mkdir(&self, path: &str) -> VfsResult<()> {
        let _ = path;
        Err(VfsError::Other)
    }

    /// Stat a file or directory.
    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let _ = path;
        Err(VfsError::Other)
    }
}
