//! Shard file format: writer and read-only handle.
//!
//! A shard persists one batch's trie. Only the first-level children of the
//! trie root are addressable from disk; everything below a first-level child
//! is one serialized subtree blob, decoded whole on access. All integers are
//! little-endian.
//!
//! Layout:
//!
//! ```text
//! magic        b"SLSH"
//! version      u8
//! line table   u32 count, then per line: u32 byte length + UTF-8 bytes
//! top table    u32 count, then per entry:
//!              u32 char scalar, u64 blob offset, u32 blob length
//! blob region  concatenated subtree blobs, offsets relative to region start
//! ```
//!
//! Subtree blob, recursively per node:
//!
//! ```text
//! varint line count, delta-encoded line ids    (terminal payload, 0 = none)
//! varint child count
//! per child: varint char scalar, child node
//! ```

use crate::index::trie::{BatchTrie, NodeId, ROOT};
use crate::index::types::LineId;
use crate::utils::{
    decode_varint, delta_decode, delta_encode, encode_varint, read_u32_le_at, read_u64_le_at,
    write_u32_le, write_u64_le,
};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SHARD_MAGIC: &[u8; 4] = b"SLSH";
const SHARD_VERSION: u8 = 1;

/// Failure to read a shard file.
///
/// `Corrupt` is the truncated/garbled case: a partially written shard (for
/// example after a crash mid-flush) must surface as this distinct kind,
/// never as silently wrong results.
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("failed to read shard {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt shard {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Serialize a batch trie into a new shard file.
///
/// Shards are write-once: this is the only code path that writes one, and
/// nothing ever reopens a shard for writing.
pub fn write_shard(path: &Path, trie: &BatchTrie) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create shard file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    out.write_all(SHARD_MAGIC)?;
    out.write_all(&[SHARD_VERSION])?;

    // Line table
    let lines = trie.lines();
    write_u32_le(&mut out, lines.len() as u32)?;
    for line in lines {
        let bytes = line.as_bytes();
        write_u32_le(&mut out, bytes.len() as u32)?;
        out.write_all(bytes)?;
    }

    // Encode one blob per first-level child
    let top = trie.children_sorted(ROOT);
    let mut blobs: Vec<(char, Vec<u8>)> = Vec::with_capacity(top.len());
    for (ch, node) in top {
        let mut buf = Vec::new();
        encode_subtree(trie, node, &mut buf);
        blobs.push((ch, buf));
    }

    // Top table, then the blob region
    write_u32_le(&mut out, blobs.len() as u32)?;
    let mut offset: u64 = 0;
    for (ch, blob) in &blobs {
        write_u32_le(&mut out, *ch as u32)?;
        write_u64_le(&mut out, offset)?;
        write_u32_le(&mut out, blob.len() as u32)?;
        offset += blob.len() as u64;
    }
    for (_, blob) in &blobs {
        out.write_all(blob)?;
    }

    out.flush()
        .with_context(|| format!("failed to flush shard file {}", path.display()))?;
    Ok(())
}

/// Recursively encode a node record
fn encode_subtree(trie: &BatchTrie, node: NodeId, buf: &mut Vec<u8>) {
    let lines = trie.terminal(node);
    encode_varint(lines.len() as u32, buf);
    delta_encode(lines, buf);

    let children = trie.children_sorted(node);
    encode_varint(children.len() as u32, buf);
    for (ch, child) in children {
        encode_varint(ch as u32, buf);
        encode_subtree(trie, child, buf);
    }
}

/// A decoded subtree, materialized whole from its blob
struct DecodedNode {
    lines: Vec<LineId>,
    children: Vec<(char, DecodedNode)>,
}

/// Read-only handle on one shard file.
///
/// Opened, consulted, and dropped within a single search step; the handle
/// never outlives its use.
pub struct ShardReader {
    path: PathBuf,
    mmap: Mmap,
    lines: Vec<String>,
    /// First-level entries: character and its blob's absolute byte range
    top: Vec<(char, std::ops::Range<usize>)>,
}

impl ShardReader {
    /// Open and validate a shard file
    pub fn open(path: &Path) -> Result<Self, ShardError> {
        let io_err = |source| ShardError::Io {
            path: path.to_path_buf(),
            source,
        };
        let corrupt = |reason: &str| ShardError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let file = File::open(path).map_err(io_err)?;
        // Read-only mapping of an immutable file
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
        let buf: &[u8] = &mmap;

        if buf.len() < SHARD_MAGIC.len() + 1 || &buf[..4] != SHARD_MAGIC {
            return Err(corrupt("bad magic"));
        }
        if buf[4] != SHARD_VERSION {
            return Err(corrupt("unsupported version"));
        }
        let mut pos = 5;

        // Line table
        let (line_count, next) = read_u32_le_at(buf, pos).ok_or_else(|| corrupt("truncated line table"))?;
        pos = next;
        let mut lines = Vec::with_capacity(line_count as usize);
        for _ in 0..line_count {
            let (len, next) = read_u32_le_at(buf, pos).ok_or_else(|| corrupt("truncated line table"))?;
            pos = next;
            let end = pos
                .checked_add(len as usize)
                .filter(|&e| e <= buf.len())
                .ok_or_else(|| corrupt("truncated line table"))?;
            let text = std::str::from_utf8(&buf[pos..end])
                .map_err(|_| corrupt("invalid UTF-8 in line table"))?;
            lines.push(text.to_string());
            pos = end;
        }

        // Top table
        let (top_count, next) = read_u32_le_at(buf, pos).ok_or_else(|| corrupt("truncated top table"))?;
        pos = next;
        let mut raw_top = Vec::with_capacity(top_count as usize);
        for _ in 0..top_count {
            let (scalar, next) = read_u32_le_at(buf, pos).ok_or_else(|| corrupt("truncated top table"))?;
            pos = next;
            let (offset, next) = read_u64_le_at(buf, pos).ok_or_else(|| corrupt("truncated top table"))?;
            pos = next;
            let (len, next) = read_u32_le_at(buf, pos).ok_or_else(|| corrupt("truncated top table"))?;
            pos = next;
            let ch = char::from_u32(scalar).ok_or_else(|| corrupt("invalid character in top table"))?;
            raw_top.push((ch, offset, len));
        }

        // Resolve blob ranges against the region that follows the table
        let region_start = pos;
        let mut top = Vec::with_capacity(raw_top.len());
        for (ch, offset, len) in raw_top {
            let start = region_start
                .checked_add(offset as usize)
                .ok_or_else(|| corrupt("blob offset out of range"))?;
            let end = start
                .checked_add(len as usize)
                .filter(|&e| e <= buf.len())
                .ok_or_else(|| corrupt("blob range out of file bounds"))?;
            top.push((ch, start..end));
        }

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            lines,
            top,
        })
    }

    /// Lines whose tokens contain `query` as a substring, within this shard.
    ///
    /// Absent first character, broken path, or missing terminal all
    /// contribute nothing; only a malformed file is an error.
    pub fn lookup(&self, query: &str) -> Result<Vec<&str>, ShardError> {
        let mut chars = query.chars();
        let Some(first) = chars.next() else {
            // No root-level terminal exists: shortest stored substring is one char
            return Ok(Vec::new());
        };

        let Some((_, range)) = self.top.iter().find(|(ch, _)| *ch == first) else {
            return Ok(Vec::new());
        };

        let blob = &self.mmap[range.clone()];
        let (root, consumed) = decode_subtree(blob).ok_or_else(|| self.corrupt("truncated subtree blob"))?;
        if consumed != blob.len() {
            return Err(self.corrupt("trailing bytes after subtree blob"));
        }

        let mut node = &root;
        for ch in chars {
            match node.children.iter().find(|(c, _)| *c == ch) {
                Some((_, child)) => node = child,
                None => return Ok(Vec::new()),
            }
        }

        let mut result = Vec::with_capacity(node.lines.len());
        for &id in &node.lines {
            let line = self
                .lines
                .get(id as usize)
                .ok_or_else(|| self.corrupt("line id out of range"))?;
            result.push(line.as_str());
        }
        Ok(result)
    }

    fn corrupt(&self, reason: &str) -> ShardError {
        ShardError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Decode a node record from the front of `buf`.
/// Returns the node and the bytes consumed, or None on truncation/overrun.
fn decode_subtree(buf: &[u8]) -> Option<(DecodedNode, usize)> {
    let mut pos = 0;

    let (line_count, consumed) = decode_varint(&buf[pos..])?;
    pos += consumed;
    let (lines, consumed) = delta_decode(&buf[pos..], line_count as usize)?;
    pos += consumed;

    let (child_count, consumed) = decode_varint(&buf[pos..])?;
    pos += consumed;
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        let (scalar, consumed) = decode_varint(&buf[pos..])?;
        pos += consumed;
        let ch = char::from_u32(scalar)?;
        let (child, consumed) = decode_subtree(&buf[pos..])?;
        pos += consumed;
        children.push((ch, child));
    }

    Some((DecodedNode { lines, children }, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::trie::substrings;
    use std::fs;

    fn temp_shard(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("subline_shard_tests_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn build_trie(lines: &[&str]) -> BatchTrie {
        let mut trie = BatchTrie::new();
        for line in lines {
            let id = trie.intern_line(line);
            for token in line.split(' ').filter(|t| !t.is_empty()) {
                for sub in substrings(token) {
                    trie.insert(sub, id);
                }
            }
        }
        trie
    }

    #[test]
    fn test_write_then_lookup() {
        let path = temp_shard("roundtrip.db");
        let trie = build_trie(&["cat dog", "car bus"]);
        write_shard(&path, &trie).unwrap();

        let reader = ShardReader::open(&path).unwrap();
        let mut hits = reader.lookup("ca").unwrap();
        hits.sort_unstable();
        assert_eq!(hits, vec!["car bus", "cat dog"]);
        assert_eq!(reader.lookup("dog").unwrap(), vec!["cat dog"]);
        assert!(reader.lookup("xyz").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_path_falls_off_trie() {
        // A query longer than every token falls off the trie mid-descent
        let path = temp_shard("partial.db");
        let trie = build_trie(&["cat"]);
        write_shard(&path, &trie).unwrap();

        let reader = ShardReader::open(&path).unwrap();
        assert!(reader.lookup("cats").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_empty_query() {
        let path = temp_shard("empty_query.db");
        let trie = build_trie(&["cat"]);
        write_shard(&path, &trie).unwrap();

        let reader = ShardReader::open(&path).unwrap();
        assert!(reader.lookup("").unwrap().is_empty());
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let path = temp_shard("bad_magic.db");
        fs::write(&path, b"NOPE\x01rest of file").unwrap();
        match ShardReader::open(&path) {
            Err(ShardError::Corrupt { reason, .. }) => assert_eq!(reason, "bad magic"),
            other => panic!("expected corrupt, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_open_rejects_truncated_file() {
        let path = temp_shard("truncated.db");
        let full = temp_shard("truncated_full.db");
        let trie = build_trie(&["cat dog", "car bus"]);
        write_shard(&full, &trie).unwrap();

        let bytes = fs::read(&full).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        // Truncation lands either in a table (open fails) or in the blob
        // region (lookup fails), but never yields silently wrong results
        match ShardReader::open(&path) {
            Err(ShardError::Corrupt { .. }) => {}
            Err(other) => panic!("expected corrupt, got {other:?}"),
            Ok(reader) => {
                assert!(matches!(
                    reader.lookup("ca"),
                    Err(ShardError::Corrupt { .. })
                ));
            }
        }
    }

    #[test]
    fn test_multibyte_characters_roundtrip() {
        let path = temp_shard("multibyte.db");
        let trie = build_trie(&["naïve café"]);
        write_shard(&path, &trie).unwrap();

        let reader = ShardReader::open(&path).unwrap();
        assert_eq!(reader.lookup("ïve").unwrap(), vec!["naïve café"]);
        assert_eq!(reader.lookup("afé").unwrap(), vec!["naïve café"]);
    }
}
