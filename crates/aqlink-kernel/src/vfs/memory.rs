//! In-memory filesystem backend.
//!
//! Serves as the block-filesystem provider in tests and as scratch storage
//! on desktop builds. All data is lost when dropped.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use aqlink_types::proto::MAX_FDS;
use aqlink_types::{fat_datetime, DirEntry, DirFlags, FileStat, OpenFlags, SeekWhence, VfsError, VfsResult};
use async_trait::async_trait;

use super::traits::VfsBackend;

/// Entry in the tree, keyed by backend-local path ("" is the root).
#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, fdate: u16, ftime: u16 },
    Directory { fdate: u16, ftime: u16 },
}

/// One open file handle.
#[derive(Debug, Clone)]
struct OpenFile {
    path: String,
    offset: usize,
    flags: OpenFlags,
}

/// In-memory filesystem.
///
/// Thread-safe via internal locks; the handle table is bounded to the same
/// ten slots a real block-filesystem driver carries.
#[derive(Debug)]
pub struct MemoryFs {
    entries: RwLock<HashMap<String, Node>>,
    handles: Mutex<Vec<Option<OpenFile>>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        let (fdate, ftime) = fat_datetime(std::time::SystemTime::now());
        // Root directory always exists
        entries.insert(String::new(), Node::Directory { fdate, ftime });
        Self {
            entries: RwLock::new(entries),
            handles: Mutex::new((0..MAX_FDS).map(|_| None).collect()),
        }
    }

    /// Strip leading separators; backend-local paths are root-relative.
    fn norm(path: &str) -> &str {
        path.trim_start_matches(['/', '\\'])
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        }
    }

    fn name_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(idx) => &path[idx + 1..],
            None => path,
        }
    }

    fn with_handle<R>(&self, fd: u8, f: impl FnOnce(&mut OpenFile) -> VfsResult<R>) -> VfsResult<R> {
        let mut handles = self.handles.lock().unwrap();
        match handles.get_mut(fd as usize) {
            Some(Some(open)) => f(open),
            _ => Err(VfsError::InvalidParam),
        }
    }
}

#[async_trait]
impl VfsBackend for MemoryFs {
    async fn open(&self, flags: OpenFlags, path: &str) -> VfsResult<u8> {
        let path = Self::norm(path).to_string();
        let mut entries = self.entries.write().unwrap();

        match entries.get_mut(&path) {
            Some(Node::Directory { .. }) => return Err(VfsError::InvalidParam),
            Some(Node::File { data, .. }) => {
                if flags.create() && flags.exclusive() {
                    return Err(VfsError::AlreadyExists);
                }
                if flags.truncate() && flags.is_writable() {
                    data.clear();
                }
            }
            None => {
                if !flags.create() {
                    return Err(VfsError::NotFound);
                }
                // Parent directory must exist
                if !matches!(entries.get(Self::parent_of(&path)), Some(Node::Directory { .. })) {
                    return Err(VfsError::NotFound);
                }
                let (fdate, ftime) = fat_datetime(std::time::SystemTime::now());
                entries.insert(path.clone(), Node::File { data: Vec::new(), fdate, ftime });
            }
        }

        let offset = if flags.append() {
            match entries.get(&path) {
                Some(Node::File { data, .. }) => data.len(),
                _ => 0,
            }
        } else {
            0
        };
        drop(entries);

        let mut handles = self.handles.lock().unwrap();
        let slot = handles
            .iter()
            .position(|h| h.is_none())
            .ok_or(VfsError::TooManyOpen)?;
        handles[slot] = Some(OpenFile { path, offset, flags });
        Ok(slot as u8)
    }

    async fn close(&self, fd: u8) -> VfsResult<()> {
        let mut handles = self.handles.lock().unwrap();
        match handles.get_mut(fd as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(VfsError::InvalidParam),
        }
    }

    async fn read(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let entries = self.entries.read().unwrap();
        self.with_handle(fd, |open| {
            if !open.flags.is_readable() {
                return Err(VfsError::InvalidParam);
            }
            let Some(Node::File { data, .. }) = entries.get(&open.path) else {
                return Err(VfsError::NotFound);
            };
            let start = open.offset.min(data.len());
            let end = (start + size as usize).min(data.len());
            open.offset = end;
            Ok(data[start..end].to_vec())
        })
    }

    async fn read_line(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let entries = self.entries.read().unwrap();
        self.with_handle(fd, |open| {
            if !open.flags.is_readable() {
                return Err(VfsError::InvalidParam);
            }
            let Some(Node::File { data, .. }) = entries.get(&open.path) else {
                return Err(VfsError::NotFound);
            };
            if open.offset >= data.len() {
                return Err(VfsError::EndOfFile);
            }
            let start = open.offset;
            let limit = (start + size as usize).min(data.len());
            let end = match data[start..limit].iter().position(|&b| b == b'\n') {
                Some(idx) => start + idx + 1,
                None => limit,
            };
            open.offset = end;
            Ok(data[start..end].to_vec())
        })
    }

    async fn write(&self, fd: u8, buf: &[u8]) -> VfsResult<usize> {
        let mut entries = self.entries.write().unwrap();
        self.with_handle(fd, |open| {
            if !open.flags.is_writable() {
                return Err(VfsError::Other);
            }
            let Some(Node::File { data, .. }) = entries.get_mut(&open.path) else {
                return Err(VfsError::NotFound);
            };
            if open.flags.append() {
                open.offset = data.len();
            }
            // Writing past the end zero-fills the gap
            if open.offset > data.len() {
                data.resize(open.offset, 0);
            }
            let end = open.offset + buf.len();
            if end > data.len() {
                data.resize(end, 0);
            }
            data[open.offset..end].copy_from_slice(buf);
            open.offset = end;
            Ok(buf.len())
        })
    }

    async fn seek(&self, fd: u8, offset: u32) -> VfsResult<()> {
        self.with_handle(fd, |open| {
            open.offset = offset as usize;
            Ok(())
        })
    }

    async fn lseek(&self, fd: u8, offset: i32, whence: SeekWhence) -> VfsResult<u32> {
        let entries = self.entries.read().unwrap();
        self.with_handle(fd, |open| {
            let size = match entries.get(&open.path) {
                Some(Node::File { data, .. }) => data.len() as i64,
                _ => return Err(VfsError::NotFound),
            };
            let base = match whence {
                SeekWhence::Set => 0,
                SeekWhence::Cur => open.offset as i64,
                SeekWhence::End => size,
            };
            let target = (base + offset as i64).max(0);
            open.offset = target as usize;
            Ok(target as u32)
        })
    }

    async fn tell(&self, fd: u8) -> VfsResult<u32> {
        self.with_handle(fd, |open| Ok(open.offset as u32))
    }

    async fn enumerate(&self, path: &str, flags: DirFlags) -> VfsResult<Vec<DirEntry>> {
        if flags.mode83() {
            return Err(VfsError::InvalidParam);
        }
        let path = Self::norm(path);
        let entries = self.entries.read().unwrap();
        if !matches!(entries.get(path), Some(Node::Directory { .. })) {
            return Err(VfsError::NotFound);
        }

        let mut result = Vec::new();
        for (key, node) in entries.iter() {
            if key.is_empty() || Self::parent_of(key) != path {
                continue;
            }
            let name = Self::name_of(key);
            if !flags.hidden() && name.starts_with('.') {
                continue;
            }
            result.push(match node {
                Node::File { data, fdate, ftime } => {
                    DirEntry::file(name, data.len() as u32, *fdate, *ftime)
                }
                Node::Directory { fdate, ftime } => DirEntry::directory(name, *fdate, *ftime),
            });
        }
        Ok(result)
    }

    async fn delete(&self, path: &str) -> VfsResult<()> {
        let path = Self::norm(path);
        if path.is_empty() {
            return Err(VfsError::InvalidParam);
        }
        let mut entries = self.entries.write().unwrap();
        match entries.get(path) {
            None => Err(VfsError::NotFound),
            Some(Node::File { .. }) => {
                entries.remove(path);
                Ok(())
            }
            Some(Node::Directory { .. }) => {
                let has_children = entries.keys().any(|k| !k.is_empty() && Self::parent_of(k) == path);
                if has_children {
                    return Err(VfsError::NotEmpty);
                }
                entries.remove(path);
                Ok(())
            }
        }
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> VfsResult<()> {
        let old_path = Self::norm(old_path).to_string();
        let new_path = Self::norm(new_path).to_string();
        if old_path == new_path {
            return Ok(());
        }
        if old_path.is_empty() || new_path.is_empty() {
            return Err(VfsError::InvalidParam);
        }
        let mut entries = self.entries.write().unwrap();
        if !entries.contains_key(&old_path) {
            return Err(VfsError::NotFound);
        }
        if entries.contains_key(&new_path) {
            return Err(VfsError::AlreadyExists);
        }
        if !matches!(entries.get(Self::parent_of(&new_path)), Some(Node::Directory { .. })) {
            return Err(VfsError::NotFound);
        }

        let node = entries.remove(&old_path).unwrap();
        let is_dir = matches!(node, Node::Directory { .. });
        entries.insert(new_path.clone(), node);

        if is_dir {
            // Move the whole subtree
            let prefix = format!("{old_path}/");
            let moved: Vec<String> = entries
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for key in moved {
                let node = entries.remove(&key).unwrap();
                let new_key = format!("{new_path}/{}", &key[prefix.len()..]);
                entries.insert(new_key, node);
            }
        }
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> VfsResult<()> {
        let path = Self::norm(path).to_string();
        if path.is_empty() {
            return Err(VfsError::AlreadyExists);
        }
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&path) {
            return Err(VfsError::AlreadyExists);
        }
        if !matches!(entries.get(Self::parent_of(&path)), Some(Node::Directory { .. })) {
            return Err(VfsError::NotFound);
        }
        let (fdate, ftime) = fat_datetime(std::time::SystemTime::now());
        entries.insert(path, Node::Directory { fdate, ftime });
        Ok(())
    }

    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let path = Self::norm(path);
        let entries = self.entries.read().unwrap();
        match entries.get(path) {
            Some(Node::File { data, fdate, ftime }) => Ok(FileStat {
                size: data.len() as u32,
                is_dir: false,
                fdate: *fdate,
                ftime: *ftime,
            }),
            Some(Node::Directory { fdate, ftime }) => Ok(FileStat {
                size: 0,
                is_dir: true,
                fdate: *fdate,
                ftime: *ftime,
            }),
            None => Err(VfsError::NotFound),
        }
    }
}
