//! Directory entries and file metadata with FAT-style packed timestamps.

use chrono::{Datelike, Local, TimeZone, Timelike};

/// Attribute bit: entry is a directory.
pub const ATTR_DIR: u8 = 1 << 0;

/// One entry of a directory snapshot, as sent in a READDIR response.
///
/// Filenames keep the backend-native case; sorting and wildcard matching are
/// case-insensitive but never rewrite the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (not a full path).
    pub name: String,
    /// Size in bytes (0 for directories).
    pub size: u32,
    /// Attribute bitmask (`ATTR_DIR`).
    pub attr: u8,
    /// FAT packed date (bits 15..9 year-1980, 8..5 month, 4..0 day).
    pub fdate: u16,
    /// FAT packed time (bits 15..11 hour, 10..5 minute, 4..0 seconds/2).
    pub ftime: u16,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, size: u32, fdate: u16, ftime: u16) -> Self {
        Self {
            name: name.into(),
            size,
            attr: 0,
            fdate,
            ftime,
        }
    }

    pub fn directory(name: impl Into<String>, fdate: u16, ftime: u16) -> Self {
        Self {
            name: name.into(),
            size: 0,
            attr: ATTR_DIR,
            fdate,
            ftime,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIR != 0
    }
}

/// Result of a `stat` call: just enough for the STAT response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u32,
    pub is_dir: bool,
    pub fdate: u16,
    pub ftime: u16,
}

impl FileStat {
    pub fn attr(&self) -> u8 {
        if self.is_dir { ATTR_DIR } else { 0 }
    }
}

/// Pack a date into FAT on-disk form. Years before 1980 clamp to 1980.
pub fn fat_date(year: i32, month: u32, day: u32) -> u16 {
    let y = (year - 1980).clamp(0, 127) as u16;
    (y << 9) | ((month as u16) << 5) | day as u16
}

/// Pack a time into FAT on-disk form (2-second resolution).
pub fn fat_time(hour: u32, minute: u32, second: u32) -> u16 {
    ((hour as u16) << 11) | ((minute as u16) << 5) | (second as u16 / 2)
}

/// Convert a `SystemTime` to (fdate, ftime) in local time.
///
/// Times that predate the FAT epoch come out as the epoch itself.
pub fn fat_datetime(t: std::time::SystemTime) -> (u16, u16) {
    let secs = t
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let dt = match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt,
        _ => return (fat_date(1980, 1, 1), 0),
    };
    (
        fat_date(dt.year(), dt.month(), dt.day()),
        fat_time(dt.hour(), dt.minute(), dt.second()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat_date_packing() {
        // 2024-06-15: year offset 44, month 6, day 15
        assert_eq!(fat_date(2024, 6, 15), (44 << 9) | (6 << 5) | 15);
        // Pre-epoch clamps
        assert_eq!(fat_date(1975, 1, 1) >> 9, 0);
    }

    #[test]
    fn fat_time_packing() {
        assert_eq!(fat_time(13, 30, 42), (13 << 11) | (30 << 5) | 21);
    }

    #[test]
    fn dir_entry_attrs() {
        assert!(DirEntry::directory("sub", 0, 0).is_dir());
        assert!(!DirEntry::file("a.txt", 3, 0, 0).is_dir());
    }
}
