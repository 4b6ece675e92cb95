//! aqlink-kernel: the protocol core that bridges a serial-attached FPGA
//! retro-computer core to storage the bridge MCU can reach.
//!
//! The FPGA side has no filesystem or clock of its own. It sends framed,
//! variable-length commands over a full-duplex byte stream; this crate turns
//! that stream into discrete commands, routes each filesystem-flavored
//! command through a virtual-filesystem multiplexer, and writes the framed
//! response back.
//!
//! ```text
//! raw bytes ──▶ FrameDecoder ──▶ CommandInterpreter ──▶ VfsContext ──▶ VfsBackend
//!                 (de-escape)      (accumulate +          (resolve +      (storage)
//!                                   dispatch)              forward)
//!                                      │
//!               raw bytes ◀── EscapedSink ◀── response bytes
//! ```
//!
//! # Components
//!
//! - [`proto`] — frame transport (escaped and FIFO variants) and the
//!   command interpreter state machine
//! - [`resolve`] — path resolution: caller path + current directory →
//!   (backend, backend-local path, optional wildcard)
//! - [`context`] — [`VfsContext`]: bounded file/directory descriptor tables
//!   and directory-enumeration snapshotting
//! - [`vfs`] — the [`VfsBackend`] provider trait, the [`BackendSet`] service
//!   locator, and the in-tree providers (memory, host-directory, ROM archive)
//!
//! Exactly one [`VfsContext`] exists per link. Backends are shared,
//! application-lifetime services reached through the [`BackendSet`]; a
//! system driving several independent links gives each its own context and
//! interpreter over the same backend set.

pub mod context;
pub mod proto;
pub mod resolve;
pub mod vfs;

pub use context::VfsContext;
pub use proto::{
    ByteSink, CommandInterpreter, CoreHandler, CoreLoader, CoreReply, EscapedSink, FifoDecoder,
    FrameDecoder, GamePadData, MidiQueue, NullCore, RxEvent,
};
pub use resolve::{resolve_path, Resolved};
pub use vfs::{BackendKind, BackendSet, LocalFs, MemoryFs, RomFs, VfsBackend};
