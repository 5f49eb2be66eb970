use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of an interned line within a single shard's line table
pub type LineId = u32;

/// File extension of shard files inside the datastore directory
pub const SHARD_EXT: &str = "db";

/// Suffix appended to the input file name to form the datastore directory
pub const DATASTORE_SUFFIX: &str = ".datastore.db";

/// Name of the informational metadata file inside the datastore directory
pub const META_FILE: &str = "meta.json";

/// Configuration for the indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Input lines accumulated per shard before a flush
    pub batch_size: usize,
    /// Show a progress spinner during the build
    #[serde(default)]
    pub progress: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            progress: false,
        }
    }
}

/// Index metadata stored in meta.json.
///
/// Informational only: the build-or-reuse decision is based solely on the
/// presence of shard files, never on this file's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub source_path: PathBuf,
    pub batch_size: usize,
    pub line_count: u64,
    pub shard_count: u32,
    pub created_at: u64,
}

/// Summary of a datastore directory for display
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub shard_dir: PathBuf,
    pub shard_count: usize,
    pub total_bytes: u64,
    pub meta: Option<IndexMeta>,
}
