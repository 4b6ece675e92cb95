//! Read-only archive backend.
//!
//! Serves files baked into the firmware image (the `esp:` prefix). The
//! namespace is flat: enumeration ignores the path, and stat of the empty
//! path is the archive root. Exactly one file can be open at a time, which
//! is all the boot ROM ever needs.
//!
//! Writes report [`VfsError::WriteProtected`]; `delete`, `rename`, and
//! `mkdir` fall through to the trait defaults.

use std::sync::Mutex;

use aqlink_types::{DirEntry, DirFlags, FileStat, OpenFlags, SeekWhence, VfsError, VfsResult};
use async_trait::async_trait;

use super::traits::VfsBackend;

#[derive(Debug, Clone)]
struct RomFile {
    name: String,
    data: Vec<u8>,
    fdate: u16,
    ftime: u16,
}

#[derive(Debug, Clone, Copy)]
struct OpenRom {
    index: usize,
    offset: usize,
}

/// Read-only archive backend.
#[derive(Debug)]
pub struct RomFs {
    files: Vec<RomFile>,
    open: Mutex<Option<OpenRom>>,
}

/// Builder assembling the archive contents at firmware startup.
#[derive(Debug, Default)]
pub struct RomFsBuilder {
    files: Vec<RomFile>,
}

impl RomFsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the archive.
    pub fn file(
        mut self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        fdate: u16,
        ftime: u16,
    ) -> Self {
        self.files.push(RomFile {
            name: name.into(),
            data: data.into(),
            fdate,
            ftime,
        });
        self
    }

    pub fn build(self) -> RomFs {
        RomFs {
            files: self.files,
            open: Mutex::new(None),
        }
    }
}

impl RomFs {
    pub fn builder() -> RomFsBuilder {
        RomFsBuilder::new()
    }

    /// Strip leading separators; lookups are case-insensitive.
    fn find(&self, path: &str) -> Option<usize> {
        let path = path.trim_start_matches(['/', '\\']);
        self.files
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(path))
    }
}

#[async_trait]
impl VfsBackend for RomFs {
    async fn open(&self, _flags: OpenFlags, path: &str) -> VfsResult<u8> {
        let index = self.find(path).ok_or(VfsError::NotFound)?;
        let mut open = self.open.lock().unwrap();
        if open.is_some() {
            return Err(VfsError::TooManyOpen);
        }
        *open = Some(OpenRom { index, offset: 0 });
        Ok(0)
    }

    async fn close(&self, fd: u8) -> VfsResult<()> {
        if fd != 0 {
            return Err(VfsError::InvalidParam);
        }
        *self.open.lock().unwrap() = None;
        Ok(())
    }

    async fn read(&self, fd: u8, size: u16) -> VfsResult<Vec<u8>> {
        let mut open = self.open.lock().unwrap();
        let state = match open.as_mut() {
            Some(state) if fd == 0 => state,
            _ => return Err(VfsError::InvalidParam),
        };
        let data = &self.files[state.index].data;
        let start = state.offset.min(data.len());
        let end = (start + size as usize).min(data.len());
        state.offset = end;
        Ok(data[start..end].to_vec())
    }

    async fn write(&self, _fd: u8, _data: &[u8]) -> VfsResult<usize> {
        Err(VfsError::WriteProtected)
    }

    async fn seek(&self, fd: u8, offset: u32) -> VfsResult<()> {
        let mut open = self.open.lock().unwrap();
        let state = match open.as_mut() {
            Some(state) if fd == 0 => state,
            _ => return Err(VfsError::InvalidParam),
        };
        // Clamp to the end of the file
        state.offset = (offset as usize).min(self.files[state.index].data.len());
        Ok(())
    }

    async fn lseek(&self, fd: u8, offset: i32, whence: SeekWhence) -> VfsResult<u32> {
        let mut open = self.open.lock().unwrap();
        let state = match open.as_mut() {
            Some(state) if fd == 0 => state,
            _ => return Err(VfsError::InvalidParam),
        };
        let size = self.files[state.index].data.len() as i64;
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => state.offset as i64,
            SeekWhence::End => size,
        };
        let target = (base + offset as i64).clamp(0, size);
        state.offset = target as usize;
        Ok(target as u32)
    }

    async fn tell(&self, fd: u8) -> VfsResult<u32> {
        let open = self.open.lock().unwrap();
        match open.as_ref() {
            Some(state) if fd == 0 => Ok(state.offset as u32),
            _ => Err(VfsError::InvalidParam),
        }
    }

    async fn enumerate(&self, _path: &str, flags: DirFlags) -> VfsResult<Vec<DirEntry>> {
        if flags.mode83() {
            return Err(VfsError::InvalidParam);
        }
        Ok(self
            .files
            .iter()
            .map(|f| DirEntry::file(f.name.clone(), f.data.len() as u32, f.fdate, f.ftime))
            .collect())
    }

    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let trimmed = path.trim_start_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Ok(FileStat {
                size: 0,
                is_dir: true,
                fdate: 0,
                ftime: 0,
            });
        }
        let index = self.find(path).ok_or(VfsError::NotFound)?;
        let f = &self.files[index];
        Ok(FileStat {
            size: f.data.len() as u32,
            is_dir: false,
            fdate: f.fdate,
            ftime: f.ftime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RomFs {
        RomFs::builder()
            .file("boot.bin", vec![0xAA; 32], 0x58CF, 0x6C20)
            .file("README.TXT", b"hello rom".to_vec(), 0x58CF, 0x6C20)
            .build()
    }

    #[tokio::test]
    async fn open_is_case_insensitive() {
        let rom = sample();
        let fd = rom.open(OpenFlags(OpenFlags::RDONLY), "readme.txt").await.unwrap();
        assert_eq!(rom.read(fd, 64).await.unwrap(), b"hello rom");
        rom.close(fd).await.unwrap();
    }

    #[tokio::test]
    async fn single_open_slot() {
        let rom = sample();
        let fd = rom.open(OpenFlags(OpenFlags::RDONLY), "boot.bin").await.unwrap();
        assert_eq!(
            rom.open(OpenFlags(OpenFlags::RDONLY), "README.TXT").await,
            Err(VfsError::TooManyOpen)
        );
        rom.close(fd).await.unwrap();
        assert!(rom.open(OpenFlags(OpenFlags::RDONLY), "README.TXT").await.is_ok());
    }

    #[tokio::test]
    async fn writes_are_protected_and_mutations_unsupported() {
        let rom = sample();
        let fd = rom.open(OpenFlags(OpenFlags::RDWR), "boot.bin").await.unwrap();
        assert_eq!(rom.write(fd, b"x").await, Err(VfsError::WriteProtected));
        rom.close(fd).await.unwrap();

        // Trait defaults: not implemented at all
        assert_eq!(rom.delete("boot.bin").await, Err(VfsError::Other));
        assert_eq!(rom.mkdir("d").await, Err(VfsError::Other));
        assert_eq!(rom.rename("a", "b").await, Err(VfsError::Other));
    }

    #[tokio::test]
    async fn seek_clamps_to_file_size() {
        let rom = sample();
        let fd = rom.open(OpenFlags(OpenFlags::RDONLY), "boot.bin").await.unwrap();
        rom.seek(fd, 1000).await.unwrap();
        assert_eq!(rom.tell(fd).await.unwrap(), 32);
        assert!(rom.read(fd, 8).await.unwrap().is_empty());
        rom.close(fd).await.unwrap();
    }

    #[tokio::test]
    async fn stat_root_is_directory() {
        let rom = sample();
        assert!(rom.stat("").await.unwrap().is_dir);
        assert!(rom.stat("/").await.unwrap().is_dir);
        let st = rom.stat("BOOT.BIN").await.unwrap();
        assert!(!st.is_dir);
        assert_eq!(st.size, 32);
    }
}
