//! Virtual filesystem backends for aqlink.
//!
//! A backend is one storage provider behind the multiplexer:
//!
//! - **MemoryFs**: in-memory read/write tree (scratch storage and tests)
//! - **LocalFs**: host-directory-rooted provider — the SD card stand-in on
//!   desktop builds
//! - **RomFs**: read-only archive baked into the firmware image
//! - HTTP and TCP providers are external; they plug into the same trait
//!
//! # Design
//!
//! Backends are a closed set selected by path prefix, not a mount table:
//! `esp:` picks the ROM archive, `http://`/`https://`/`tcp://` pick the
//! network providers, anything else lands on the block filesystem. The
//! [`BackendSet`] maps a [`BackendKind`] to its provider; resolution happens
//! in [`crate::resolve`], never inside a backend.
//!
//! Backends are shared across links and serialize their own internal state;
//! the multiplexer above performs no locking.

mod local;
mod memory;
mod rom;
mod services;
mod traits;

pub use local::LocalFs;
pub use memory::MemoryFs;
pub use rom::{RomFs, RomFsBuilder};
pub use services::{BackendKind, BackendSet};
pub use traits::VfsBackend;
