//! Host-directory filesystem backend.
//!
//! The SD card stand-in on desktop builds: all operations happen beneath a
//! root directory on the host filesystem, through `tokio::fs`. The resolver
//! has already normalized away `.` and `..`, so joining below the root is a
//! plain path append.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use aqlink_types::proto::MAX_FDS;
use aqlink_types::{fat_datetime, DirEntry, DirFlags, FileStat, OpenFlags, SeekWhence, VfsError, VfsResult};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::traits::VfsBackend;

/// One open host file.
#[derive(Debug)]
struct OpenFile {
    file: fs::File,
    readable: bool,
    writable: bool,
}

/// Host-directory filesystem backend.
#[derive(Debug)]
pub struct LocalFs {
    root: PathBuf,
    handles: Mutex<Vec<Option<OpenFile>>>,
}

impl LocalFs {
    /// Create a filesystem rooted at `root`. The directory must exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: Mutex::new((0..MAX_FDS).map(|_| None).collect()),
        }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches(['/', '\\']))
    }
}

#[async_trait]
impl VfsBackend for LocalFs {
    async fn open(&self, flags: OpenFlags, path: &str) -> VfsResult<u8> {
        let full = self.full_path(path);
        let mut opts = fs::OpenOptions::new();
        opts.read(flags.is_readable())
            .write(flags.is_writable())
            .append(flags.append() && flags.is_writable())
            .truncate(flags.truncate() && flags.is_writable());
        if flags.create() {
            if flags.exclusive() {
                opts.create_new(true);
            } else {
                opts.create(true);
            }
        }

        let file = opts.open(&full).await?;
        if file.metadata().await?.is_dir() {
            return Err(VfsError::InvalidParam);
        }

        let mut handles = self.handles.lock().await;
        let slot = handles
            .iter()
            .position(|h| h.is_none())
            .ok_or(VfsError::TooManyOpen)?;
        handles[slot] = Some(OpenFile {
            file,
            readable: flags.is_readable(),
            writable: flags.is_writable(),
        });
        Ok(slot as u8)
    }

    async fn close(&self, fd: u8) -> VfsResult<()> {
        let mut handles = self.handles.lock().await;
        match handles.get_mut(fd as usize) {
            Some(slot @ Some(_)) => {
                // Dropping the File closes it; flush pending writes first
                if let Some(open) = slot.as_mut() {
                    let _ = open.file.flush().await;
                }
                *slot = None;
                Ok(())
            }
            _ => Err(VfsError::InvalidParam),
        }
    }

    async fn read(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) if open.readable => open,
            Some(Some(_)) => return Err(VfsError::InvalidParam),
            _ => return Err(VfsError::InvalidParam),
        };

        let mut buf = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = open.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    async fn read_line(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) if open.readable => open,
            _ => return Err(VfsError::InvalidParam),
        };

        // Byte-at-a-time keeps the file offset exact without a BufReader
        // wrapper; protocol lines are short.
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while line.len() < size as usize {
            let n = open.file.read(&mut byte).await?;
            if n == 0 {
                if line.is_empty() {
                    return Err(VfsError::EndOfFile);
                }
                break;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    async fn write(&self, fd: u8, data: &[u8]) -> VfsResult<usize> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) if open.writable => open,
            Some(Some(_)) => return Err(VfsError::Other),
            _ => return Err(VfsError::InvalidParam),
        };
        open.file.write_all(data).await?;
        Ok(data.len())
    }

    async fn seek(&self, fd: u8, offset: u32) -> VfsResult<()> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) => open,
            _ => return Err(VfsError::InvalidParam),
        };
        open.file.seek(SeekFrom::Start(offset as u64)).await?;
        Ok(())
    }

    async fn lseek(&self, fd: u8, offset: i32, whence: SeekWhence) -> VfsResult<u32> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) => open,
            _ => return Err(VfsError::InvalidParam),
        };
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => open.file.stream_position().await? as i64,
            SeekWhence::End => open.file.metadata().await?.len() as i64,
        };
        let target = (base + offset as i64).max(0) as u64;
        let pos = open.file.seek(SeekFrom::Start(target)).await?;
        Ok(pos as u32)
    }

    async fn tell(&self, fd: u8) -> VfsResult<u32> {
        let mut handles = self.handles.lock().await;
        let open = match handles.get_mut(fd as usize) {
            Some(Some(open)) => open,
            _ => return Err(VfsError::InvalidParam),
        };
        Ok(open.file.stream_position().await? as u32)
    }

    async fn enumerate(&self, path: &str, flags: DirFlags) -> VfsResult<Vec<DirEntry>> {
        if flags.mode83() {
            return Err(VfsError::InvalidParam);
        }
        let full = self.full_path(path);
        let mut dir = fs::read_dir(&full).await?;
        let mut result = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !flags.hidden() && name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            let (fdate, ftime) = meta
                .modified()
                .map(fat_datetime)
                .unwrap_or((0, 0));
            result.push(if meta.is_dir() {
                DirEntry::directory(name, fdate, ftime)
            } else {
                DirEntry::file(name, meta.len() as u32, fdate, ftime)
            });
        }
        Ok(result)
    }

    async fn delete(&self, path: &str) -> VfsResult<()> {
        let full = self.full_path(path);
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(_) => Ok(fs::remove_dir(&full).await?),
        }
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> VfsResult<()> {
        if old_path == new_path {
            return Ok(());
        }
        Ok(fs::rename(self.full_path(old_path), self.full_path(new_path)).await?)
    }

    async fn mkdir(&self, path: &str) -> VfsResult<()> {
        Ok(fs::create_dir(self.full_path(path)).await?)
    }

    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let meta = fs::metadata(self.full_path(path)).await?;
        let (fdate, ftime) = meta.modified().map(fat_datetime).unwrap_or((0, 0));
        Ok(FileStat {
            size: meta.len() as u32,
            is_dir: meta.is_dir(),
            fdate,
            ftime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rdonly() -> OpenFlags {
        OpenFlags(OpenFlags::RDONLY)
    }

    #[tokio::test]
    async fn write_then_stat_and_read() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(tmp.path());

        let flags = OpenFlags(OpenFlags::WRONLY | OpenFlags::CREATE);
        let fd = fs.open(flags, "x.bin").await.unwrap();
        assert_eq!(fs.write(fd, &[1, 2, 3]).await.unwrap(), 3);
        fs.close(fd).await.unwrap();

        assert_eq!(fs.stat("x.bin").await.unwrap().size, 3);

        let fd = fs.open(rdonly(), "x.bin").await.unwrap();
        assert_eq!(fs.read(fd, 16).await.unwrap(), vec![1, 2, 3]);
        fs.close(fd).await.unwrap();

        fs.delete("x.bin").await.unwrap();
        assert_eq!(fs.stat("x.bin").await, Err(VfsError::NotFound));
    }

    #[tokio::test]
    async fn read_line_stops_at_newline() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("l.txt"), b"ab\ncd").unwrap();
        let fs = LocalFs::new(tmp.path());

        let fd = fs.open(rdonly(), "l.txt").await.unwrap();
        assert_eq!(fs.read_line(fd, 64).await.unwrap(), b"ab\n");
        assert_eq!(fs.read_line(fd, 64).await.unwrap(), b"cd");
        assert_eq!(fs.read_line(fd, 64).await, Err(VfsError::EndOfFile));
        fs.close(fd).await.unwrap();
    }

    #[tokio::test]
    async fn enumerate_and_mkdir() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(tmp.path());

        fs.mkdir("sub").await.unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        std::fs::write(tmp.path().join(".hidden"), b"x").unwrap();

        let entries = fs.enumerate("", DirFlags(0)).await.unwrap();
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["a.txt", "sub"]);

        assert_eq!(
            fs.enumerate("", DirFlags(DirFlags::MODE83)).await,
            Err(VfsError::InvalidParam)
        );
    }

    #[tokio::test]
    async fn lseek_end_relative() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("f"), b"0123456789").unwrap();
        let fs = LocalFs::new(tmp.path());

        let fd = fs.open(rdonly(), "f").await.unwrap();
        assert_eq!(fs.lseek(fd, -4, SeekWhence::End).await.unwrap(), 6);
        assert_eq!(fs.tell(fd).await.unwrap(), 6);
        assert_eq!(fs.read(fd, 16).await.unwrap(), b"6789");
        fs.close(fd).await.unwrap();
    }
}
