//! # subline - persistent substring search over line-oriented corpora
//!
//! subline indexes a text file whose lines are space-separated tokens so
//! that any substring of any token can be looked up later, returning every
//! original line that contains it.
//!
//! ## Architecture
//!
//! - [`index::trie`] - substring expansion and the in-memory batch trie
//! - [`index::shard`] - write-once shard files (trie fragments on disk)
//! - [`index::store`] - datastore management: build, reuse, search
//! - [`index::stats`] - datastore statistics display
//! - [`diag`] - caller-owned diagnostic sink
//! - [`output`] - terminal result formatting
//! - [`utils`] - varint/delta encoding helpers
//!
//! ## Quick Start
//!
//! ```ignore
//! use subline::diag::StderrDiag;
//! use subline::index::store::Index;
//! use subline::index::types::IndexConfig;
//! use std::path::Path;
//!
//! let mut diag = StderrDiag::default();
//! let index = Index::prepare(Path::new("corpus.txt"), false, IndexConfig::default(), &mut diag)?;
//! for line in index.search("substr", &mut diag) {
//!     println!("{line}");
//! }
//! ```
//!
//! ## How it works
//!
//! The build streams the input one line at a time. Every token on a line is
//! expanded into all of its contiguous substrings, which are inserted into a
//! character trie whose terminal nodes record the originating lines. Every
//! `batch_size` lines (default 100) the trie is flushed as an independent
//! shard file and the builder resets, so memory stays bounded regardless of
//! corpus size. A search descends every shard's trie and unions the partial
//! answers into one deduplicated set of lines.

pub mod diag;
pub mod index;
pub mod output;
pub mod utils;
