//! Datastore management: build-or-reuse decision, the batch build loop, and
//! the per-shard search fan-out.

use crate::diag::Diag;
use crate::index::shard::{ShardReader, write_shard};
use crate::index::trie::{BatchTrie, substrings};
use crate::index::types::{DATASTORE_SUFFIX, IndexConfig, IndexMeta, IndexStats, META_FILE, SHARD_EXT};
use anyhow::{Context, Result, ensure};
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Outcome of parsing one raw input line
#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    /// Nothing on the line after trimming
    Blank,
    /// The trimmed line text, ready to tokenize
    Line(String),
    /// Unusable line, with the reason to report
    Skip(&'static str),
}

/// Parse one raw line read from the input file
fn parse_line(raw: &[u8]) -> LineOutcome {
    let Ok(text) = std::str::from_utf8(raw) else {
        return LineOutcome::Skip("not valid UTF-8");
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }
    // A non-empty trimmed line always yields at least one token, so no
    // further structural check is needed here
    LineOutcome::Line(trimmed.to_string())
}

/// Tokens of a trimmed line: split on single-space boundaries, empty
/// fragments from runs of spaces discarded
fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split(' ').filter(|t| !t.is_empty())
}

/// A prepared substring index over one input file.
///
/// Holds only paths and configuration; shard files are opened per search
/// step and closed again before the next shard is consulted.
pub struct Index {
    input: PathBuf,
    shard_dir: PathBuf,
    config: IndexConfig,
}

impl Index {
    /// Prepare the datastore for `input`: build it when no shards exist,
    /// reuse it otherwise, rebuild from scratch when `force_rebuild`.
    ///
    /// Reuse is trust-on-presence: existing shards are never validated
    /// against the current content or mtime of `input`. An edited source
    /// file requires an explicit rebuild.
    pub fn prepare(
        input: &Path,
        force_rebuild: bool,
        config: IndexConfig,
        diag: &mut dyn Diag,
    ) -> Result<Self> {
        ensure!(config.batch_size > 0, "batch size must be at least 1");

        let input = input
            .canonicalize()
            .with_context(|| format!("input file not found: {}", input.display()))?;
        ensure!(input.is_file(), "not a regular file: {}", input.display());
        // Readability probe, so an unreadable file fails here and not later
        File::open(&input)
            .with_context(|| format!("input file is unreadable: {}", input.display()))?;

        let shard_dir = shard_dir_for(&input)?;
        fs::create_dir_all(&shard_dir)
            .with_context(|| format!("failed to create datastore directory {}", shard_dir.display()))?;

        let index = Self {
            input,
            shard_dir,
            config,
        };

        if force_rebuild {
            let existing = index.shard_files()?;
            for shard in &existing {
                fs::remove_file(shard)
                    .with_context(|| format!("failed to remove shard {}", shard.display()))?;
            }
            if !existing.is_empty() {
                diag.info(&format!("removed {} existing shards", existing.len()));
            }
        }

        if index.shard_files()?.is_empty() {
            index.build(diag)?;
        } else {
            diag.info(&format!(
                "reusing existing datastore at {}",
                index.shard_dir.display()
            ));
        }

        Ok(index)
    }

    /// Full build: stream the input one line at a time, flush a shard per
    /// batch. The corpus never has to fit in memory.
    fn build(&self, diag: &mut dyn Diag) -> Result<()> {
        diag.info("populating the datastore, please wait");

        let file = File::open(&self.input)
            .with_context(|| format!("failed to open input file {}", self.input.display()))?;
        let mut reader = BufReader::new(file);

        let spinner = if self.config.progress {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap(),
            );
            spinner.set_message("Indexing...");
            spinner.enable_steady_tick(Duration::from_millis(80));
            Some(spinner)
        } else {
            None
        };

        let mut trie = BatchTrie::new();
        let mut line_count: u64 = 0;
        let mut shard_count: u32 = 0;
        let mut skipped: u64 = 0;
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .context("failed to read from input file")?;
            if read == 0 {
                break;
            }

            match parse_line(&raw) {
                LineOutcome::Blank => continue,
                LineOutcome::Skip(reason) => {
                    skipped += 1;
                    diag.warn(&format!(
                        "skipping unparseable line after line {}: {}",
                        line_count, reason
                    ));
                }
                LineOutcome::Line(line) => {
                    line_count += 1;
                    let line_id = trie.intern_line(&line);
                    for token in tokenize(&line) {
                        for sub in substrings(token) {
                            trie.insert(sub, line_id);
                        }
                    }

                    if line_count % self.config.batch_size as u64 == 0 {
                        self.flush(&mut trie, line_count)?;
                        shard_count += 1;
                        if let Some(spinner) = &spinner {
                            spinner.set_message(format!(
                                "Indexed {} lines ({} shards)",
                                line_count, shard_count
                            ));
                        }
                    }
                }
            }
        }

        // Final partial batch; an empty remainder writes no shard
        if !trie.is_empty() {
            self.flush(&mut trie, line_count)?;
            shard_count += 1;
        }

        if let Some(spinner) = spinner {
            spinner.finish_with_message(format!(
                "Indexed {} lines into {} shards",
                line_count, shard_count
            ));
        }

        self.write_meta(line_count, shard_count)?;

        diag.info(&format!(
            "datastore built: {} lines, {} shards",
            line_count, shard_count
        ));
        if skipped > 0 {
            diag.warn(&format!("{} lines were skipped", skipped));
        }
        Ok(())
    }

    /// Flush the current batch as a new shard and reset the builder.
    /// The file name embeds the cumulative count of lines processed through
    /// this batch, so shard ids are distinct and monotonic.
    fn flush(&self, trie: &mut BatchTrie, cumulative_lines: u64) -> Result<()> {
        let path = self
            .shard_dir
            .join(format!("{}.{}", cumulative_lines, SHARD_EXT));
        write_shard(&path, trie)?;
        trie.clear();
        Ok(())
    }

    /// Write informational metadata next to the shards
    fn write_meta(&self, line_count: u64, shard_count: u32) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let meta = IndexMeta {
            version: 1,
            source_path: self.input.clone(),
            batch_size: self.config.batch_size,
            line_count,
            shard_count,
            created_at: now,
        };

        let meta_path = self.shard_dir.join(META_FILE);
        let file = File::create(&meta_path)
            .with_context(|| format!("failed to create {}", meta_path.display()))?;
        serde_json::to_writer_pretty(file, &meta)?;
        Ok(())
    }

    /// Every line containing a token with `query` as a substring.
    ///
    /// Consults each shard in turn and unions the partial answers. A shard
    /// that fails to open or decode is reported to the sink and skipped, so
    /// the healthy shards still contribute. No match is an empty set, never
    /// an error.
    pub fn search(&self, query: &str, diag: &mut dyn Diag) -> FxHashSet<String> {
        let mut results = FxHashSet::default();
        if query.is_empty() {
            // No root-level terminal exists, so the empty query matches nothing
            return results;
        }

        let shards = match self.shard_files() {
            Ok(shards) => shards,
            Err(err) => {
                diag.warn(&format!("cannot list shards: {err:#}"));
                return results;
            }
        };

        for shard in shards {
            let reader = match ShardReader::open(&shard) {
                Ok(reader) => reader,
                Err(err) => {
                    diag.warn(&format!("skipping shard: {err}"));
                    continue;
                }
            };
            match reader.lookup(query) {
                Ok(lines) => {
                    for line in lines {
                        results.insert(line.to_string());
                    }
                }
                Err(err) => diag.warn(&format!("skipping shard: {err}")),
            }
            // reader (and its mapping) dropped before the next shard opens
        }

        results
    }

    /// Shard files currently in the datastore directory, sorted by their
    /// embedded cumulative line count
    pub fn shard_files(&self) -> Result<Vec<PathBuf>> {
        let mut shards = Vec::new();
        let entries = fs::read_dir(&self.shard_dir)
            .with_context(|| format!("failed to read datastore directory {}", self.shard_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SHARD_EXT) {
                shards.push(path);
            }
        }
        shards.sort_by_key(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(u64::MAX)
        });
        Ok(shards)
    }

    /// Summarize the datastore directory for display
    pub fn stats(&self) -> Result<IndexStats> {
        let shards = self.shard_files()?;
        let mut total_bytes = 0;
        for shard in &shards {
            total_bytes += fs::metadata(shard)?.len();
        }

        let meta_path = self.shard_dir.join(META_FILE);
        let meta = if meta_path.exists() {
            File::open(&meta_path)
                .ok()
                .and_then(|file| serde_json::from_reader(file).ok())
        } else {
            None
        };

        Ok(IndexStats {
            shard_dir: self.shard_dir.clone(),
            shard_count: shards.len(),
            total_bytes,
            meta,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn shard_dir(&self) -> &Path {
        &self.shard_dir
    }
}

/// Datastore directory for an input file: a sibling directory named after
/// the file, `<dir>/<name>.datastore.db/`
fn shard_dir_for(input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("input file has no usable name")?;
    let parent = input.parent().context("input file has no parent directory")?;
    Ok(parent.join(format!("{}{}", name, DATASTORE_SUFFIX)))
}
