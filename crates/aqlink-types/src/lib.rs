//! Pure data types for aqlink — error taxonomy, open flags, directory
//! entries, and protocol constants.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. It holds
//! everything that is visible on the wire between the FPGA core and the
//! bridge firmware, so that backend providers and protocol tests can agree on
//! byte-level encodings without pulling in aqlink-kernel.

pub mod dir_entry;
pub mod error;
pub mod flags;
pub mod proto;

// Flat re-exports for convenience
pub use dir_entry::*;
pub use error::*;
pub use flags::*;
