//! The VFS error taxonomy and its wire encoding.
//!
//! Every command response starts with a status byte: `0` on success, or one
//! of the negative codes below (as a signed byte). Backends and the
//! multiplexer map failures 1:1 onto this taxonomy — there is no local
//! recovery and no panic path at the dispatch boundary.

use thiserror::Error;

/// Result type for VFS and backend operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS operation errors, one variant per wire status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("file or directory not found")]
    NotFound,
    #[error("too many open files or directories")]
    TooManyOpen,
    #[error("invalid parameter")]
    InvalidParam,
    #[error("end of file or directory")]
    EndOfFile,
    #[error("file already exists")]
    AlreadyExists,
    #[error("other error")]
    Other,
    #[error("no disk")]
    NoDisk,
    #[error("directory not empty")]
    NotEmpty,
    #[error("write protected")]
    WriteProtected,
}

impl VfsError {
    /// The signed status byte written on the wire for this error.
    pub fn code(self) -> i8 {
        match self {
            VfsError::NotFound => -1,
            VfsError::TooManyOpen => -2,
            VfsError::InvalidParam => -3,
            VfsError::EndOfFile => -4,
            VfsError::AlreadyExists => -5,
            VfsError::Other => -6,
            VfsError::NoDisk => -7,
            VfsError::NotEmpty => -8,
            VfsError::WriteProtected => -9,
        }
    }
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => VfsError::NotFound,
            ErrorKind::AlreadyExists => VfsError::AlreadyExists,
            ErrorKind::PermissionDenied => VfsError::WriteProtected,
            ErrorKind::DirectoryNotEmpty => VfsError::NotEmpty,
            ErrorKind::InvalidInput => VfsError::InvalidParam,
            ErrorKind::UnexpectedEof => VfsError::EndOfFile,
            _ => VfsError::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_negative() {
        let all = [
            VfsError::NotFound,
            VfsError::TooManyOpen,
            VfsError::InvalidParam,
            VfsError::EndOfFile,
            VfsError::AlreadyExists,
            VfsError::Other,
            VfsError::NoDisk,
            VfsError::NotEmpty,
            VfsError::WriteProtected,
        ];
        for (i, err) in all.iter().enumerate() {
            assert_eq!(err.code(), -(i as i8) - 1);
        }
    }

    #[test]
    fn io_error_mapping() {
        use std::io::{Error, ErrorKind};
        assert_eq!(
            VfsError::from(Error::from(ErrorKind::NotFound)),
            VfsError::NotFound
        );
        assert_eq!(
            VfsError::from(Error::from(ErrorKind::BrokenPipe)),
            VfsError::Other
        );
    }
}
