//! The VFS multiplexer: bounded descriptor tables, current-directory state,
//! and directory-enumeration snapshotting.
//!
//! One [`VfsContext`] exists per link. It owns both descriptor tables and
//! the current-path string; backends are shared services it references but
//! never owns. Every failure maps 1:1 onto a
//! [`VfsError`](aqlink_types::VfsError) code — nothing is recovered locally
//! and nothing panics on this path.

use std::sync::Arc;

use aqlink_types::proto::{MAX_DDS, MAX_FDS, ROM_PREFIX};
use aqlink_types::{DirEntry, DirFlags, FileStat, OpenFlags, SeekWhence, VfsError, VfsResult};

use crate::resolve::resolve_path;
use crate::vfs::{BackendKind, BackendSet, VfsBackend};

/// One occupied file-descriptor slot.
struct FileSlot {
    backend: Arc<dyn VfsBackend>,
    /// Backend-local descriptor.
    fd: u8,
}

/// One occupied directory-descriptor slot: a frozen snapshot plus cursor.
struct DirSlot {
    entries: Vec<DirEntry>,
    cursor: usize,
}

/// The aggregate root of VFS state for one link.
pub struct VfsContext {
    backends: Arc<BackendSet>,
    current_path: String,
    files: [Option<FileSlot>; MAX_FDS],
    dirs: [Option<DirSlot>; MAX_DDS],
}

impl VfsContext {
    /// Create a context over a shared backend set, with an empty current
    /// directory (the block-filesystem root).
    pub fn new(backends: Arc<BackendSet>) -> Self {
        Self {
            backends,
            current_path: String::new(),
            files: std::array::from_fn(|_| None),
            dirs: std::array::from_fn(|_| None),
        }
    }

    /// The current directory, as stored (no leading `/`, possibly prefixed
    /// with `esp:`).
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Resolve a caller path to (kind, provider, backend-local path,
    /// wildcard). An unpopulated backend slot is an `InvalidParam`, reported
    /// before any backend is touched.
    fn resolve(
        &self,
        path: &str,
        extract_wildcard: bool,
    ) -> VfsResult<(BackendKind, Arc<dyn VfsBackend>, String, Option<String>)> {
        let resolved = resolve_path(path, &self.current_path, extract_wildcard);
        let backend = self
            .backends
            .get(resolved.kind)
            .ok_or(VfsError::InvalidParam)?;
        Ok((resolved.kind, backend, resolved.path, resolved.wildcard))
    }

    fn file_slot(&self, fd: u8) -> VfsResult<&FileSlot> {
        self.files
            .get(fd as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(VfsError::InvalidParam)
    }

    /// Open a file. Occupies a descriptor slot only after the backend
    /// succeeds; the returned handle is the slot index.
    pub async fn open(&mut self, flags: OpenFlags, path: &str) -> VfsResult<u8> {
        let free = self
            .files
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(VfsError::TooManyOpen)?;

        let (_, backend, local, _) = self.resolve(path, false)?;
        let backend_fd = backend.open(flags, &local).await?;
        self.files[free] = Some(FileSlot {
            backend,
            fd: backend_fd,
        });
        Ok(free as u8)
    }

    pub async fn close(&mut self, fd: u8) -> VfsResult<()> {
        let slot = self
            .files
            .get_mut(fd as usize)
            .and_then(|slot| slot.take())
            .ok_or(VfsError::InvalidParam)?;
        slot.backend.close(slot.fd).await
    }

    pub async fn read(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let slot = self.file_slot(fd)?;
        slot.backend.read(slot.fd, size).await
    }

    pub async fn read_line(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let slot = self.file_slot(fd)?;
        slot.backend.read_line(slot.fd, size).await
    }

    pub async fn write(&self, fd: u8, data: &[u8]) -> VfsResult<usize> {
        let slot = self.file_slot(fd)?;
        slot.backend.write(slot.fd, data).await
    }

    pub async fn seek(&self, fd: u8, offset: u32) -> VfsResult<()> {
        let slot = self.file_slot(fd)?;
        slot.backend.seek(slot.fd, offset).await
    }

    pub async fn lseek(&self, fd: u8, offset: i32, whence: SeekWhence) -> VfsResult<u32> {
        let slot = self.file_slot(fd)?;
        slot.backend.lseek(slot.fd, offset, whence).await
    }

    pub async fn tell(&self, fd: u8) -> VfsResult<u32> {
        let slot = self.file_slot(fd)?;
        slot.backend.tell(slot.fd).await
    }

    /// Open a directory: enumerate, synthesize `..`, filter by wildcard,
    /// sort, and freeze the result into a descriptor slot with the cursor
    /// preset to `skip_count`.
    pub async fn open_dir(&mut self, path: &str, flags: DirFlags, skip_count: u16) -> VfsResult<u8> {
        let free = self
            .dirs
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(VfsError::TooManyOpen)?;

        let (_, backend, local, wildcard) = self.resolve(path, true)?;
        let mut entries = backend.enumerate(&local, flags).await?;

        if !local.is_empty() && flags.dotdot() {
            entries.push(DirEntry::directory("..", 0, 0));
        }

        if let Some(pattern) = wildcard {
            // Directories survive a non-matching pattern when ALWAYS_DIRS
            // is set
            entries.retain(|de| {
                if de.is_dir() && flags.always_dirs() {
                    return true;
                }
                aqlink_glob::wildcard_match(&de.name, &pattern)
            });
        }

        // Directories first, then case-insensitive by name
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        self.dirs[free] = Some(DirSlot {
            entries,
            cursor: skip_count as usize,
        });
        Ok(free as u8)
    }

    pub fn close_dir(&mut self, dd: u8) -> VfsResult<()> {
        self.dirs
            .get_mut(dd as usize)
            .and_then(|slot| slot.take())
            .map(|_| ())
            .ok_or(VfsError::InvalidParam)
    }

    /// Return the entry at the cursor and advance it. `EndOfFile` once the
    /// snapshot is drained.
    pub fn read_dir(&mut self, dd: u8) -> VfsResult<DirEntry> {
        let slot = self
            .dirs
            .get_mut(dd as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(VfsError::InvalidParam)?;
        let entry = slot.entries.get(slot.cursor).ok_or(VfsError::EndOfFile)?;
        slot.cursor += 1;
        Ok(entry.clone())
    }

    pub async fn delete(&self, path: &str) -> VfsResult<()> {
        let (_, backend, local, _) = self.resolve(path, false)?;
        backend.delete(&local).await
    }

    /// Rename within a single backend. Paths resolving to different
    /// backends fail with `InvalidParam` before either side is touched.
    pub async fn rename(&self, old_path: &str, new_path: &str) -> VfsResult<()> {
        let (old_kind, backend, old_local, _) = self.resolve(old_path, false)?;
        let (new_kind, _, new_local, _) = self.resolve(new_path, false)?;
        if old_kind != new_kind {
            return Err(VfsError::InvalidParam);
        }
        backend.rename(&old_local, &new_local).await
    }

    pub async fn mkdir(&self, path: &str) -> VfsResult<()> {
        let (_, backend, local, _) = self.resolve(path, false)?;
        backend.mkdir(&local).await
    }

    /// Change the current directory. The target must stat as a directory;
    /// the stored string is re-prefixed with `esp:` when the ROM archive was
    /// selected.
    pub async fn chdir(&mut self, path: &str) -> VfsResult<()> {
        let (kind, backend, local, _) = self.resolve(path, false)?;
        let st = backend.stat(&local).await?;
        if !st.is_dir {
            return Err(VfsError::InvalidParam);
        }
        self.current_path = if kind == BackendKind::Rom {
            format!("{ROM_PREFIX}{local}")
        } else {
            local
        };
        Ok(())
    }

    pub async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let (_, backend, local, _) = self.resolve(path, false)?;
        backend.stat(&local).await
    }

    /// Read a whole file through the normal open/read/close path.
    ///
    /// Used by the bitstream-load command.
    pub async fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let (_, backend, local, _) = self.resolve(path, false)?;
        let st = backend.stat(&local).await?;
        if st.is_dir {
            return Err(VfsError::InvalidParam);
        }
        let fd = backend.open(OpenFlags(OpenFlags::RDONLY), &local).await?;
        let mut data = Vec::with_capacity(st.size as usize);
        loop {
            let chunk = match backend.read(fd, u16::MAX).await {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = backend.close(fd).await;
                    return Err(err);
                }
            };
            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
        }
        backend.close(fd).await?;
        Ok(data)
    }

    /// Release every occupied file and directory slot, closing backend
    /// descriptors first. Close failures are ignored; the slot is freed
    /// regardless.
    pub async fn close_all(&mut self) {
        for slot in &mut self.files {
            if let Some(slot) = slot.take() {
                let _ = slot.backend.close(slot.fd).await;
            }
        }
        for slot in &mut self.dirs {
            *slot = None;
        }
    }

    /// Protocol-level RESET: close everything and clear the current path.
    pub async fn reset(&mut self) {
        self.close_all().await;
        self.current_path.clear();
    }
}
