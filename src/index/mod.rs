//! Index building, persistence, and querying.

pub mod shard;
pub mod stats;
pub mod store;
pub mod trie;
pub mod types;
