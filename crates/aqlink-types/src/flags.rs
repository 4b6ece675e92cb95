//! Open-mode and directory-enumeration flag bytes.
//!
//! These are raw wire bytes, not host `OpenOptions` — the FPGA side composes
//! them directly, so the bit positions are part of the protocol.

/// File-open flags, as received in the OPEN command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(pub u8);

impl OpenFlags {
    pub const RDONLY: u8 = 0x00;
    pub const WRONLY: u8 = 0x01;
    pub const RDWR: u8 = 0x02;
    pub const ACCMODE: u8 = 0x03;

    pub const APPEND: u8 = 0x04;
    pub const CREATE: u8 = 0x08;
    pub const TRUNC: u8 = 0x10;
    pub const EXCL: u8 = 0x20;

    /// The access-mode bits (RDONLY / WRONLY / RDWR).
    pub fn accmode(self) -> u8 {
        self.0 & Self::ACCMODE
    }

    pub fn is_readable(self) -> bool {
        matches!(self.accmode(), Self::RDONLY | Self::RDWR)
    }

    pub fn is_writable(self) -> bool {
        matches!(self.accmode(), Self::WRONLY | Self::RDWR)
    }

    pub fn append(self) -> bool {
        self.0 & Self::APPEND != 0
    }

    pub fn create(self) -> bool {
        self.0 & Self::CREATE != 0
    }

    pub fn truncate(self) -> bool {
        self.0 & Self::TRUNC != 0
    }

    pub fn exclusive(self) -> bool {
        self.0 & Self::EXCL != 0
    }
}

/// Directory-enumeration flags, as received in the OPENDIREXT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirFlags(pub u8);

impl DirFlags {
    /// Keep directories even when they don't match the wildcard.
    pub const ALWAYS_DIRS: u8 = 0x01;
    /// Include hidden files (dotfiles or hidden/system attributes).
    pub const HIDDEN: u8 = 0x02;
    /// Append a synthetic `..` entry when the path is not the root.
    pub const DOTDOT: u8 = 0x04;
    /// Return names in FAT 8.3 form (backends may refuse this).
    pub const MODE83: u8 = 0x08;

    pub fn always_dirs(self) -> bool {
        self.0 & Self::ALWAYS_DIRS != 0
    }

    pub fn hidden(self) -> bool {
        self.0 & Self::HIDDEN != 0
    }

    pub fn dotdot(self) -> bool {
        self.0 & Self::DOTDOT != 0
    }

    pub fn mode83(self) -> bool {
        self.0 & Self::MODE83 != 0
    }
}

/// Whence values for the LSEEK command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

impl SeekWhence {
    /// Decode the wire byte; values above 2 are invalid.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(SeekWhence::Set),
            1 => Some(SeekWhence::Cur),
            2 => Some(SeekWhence::End),
            _ => None,
        }
    }
}
