//! Shared utilities.
//!
//! - [`encoding`] - Variable-length integer and delta encoding used by the
//!   shard file format, plus little-endian read/write helpers.

pub mod encoding;

pub use encoding::*;
