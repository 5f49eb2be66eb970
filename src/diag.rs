//! Diagnostic sink threaded through build and search.
//!
//! Replaces a process-wide logger: the caller owns the sink's lifecycle and
//! passes it explicitly into [`Index::prepare`](crate::index::store::Index::prepare)
//! and [`Index::search`](crate::index::store::Index::search). Per-line skips
//! during a build and per-shard read failures during a search are reported
//! here rather than aborting the operation.

use std::io::Write;

/// Sink for non-fatal diagnostics emitted by the engine.
pub trait Diag {
    /// Informational progress message
    fn info(&mut self, msg: &str);

    /// Something was skipped or degraded, but the operation continues
    fn warn(&mut self, msg: &str);
}

/// Sink that writes to stderr, used by the CLI
#[derive(Debug, Default)]
pub struct StderrDiag;

impl Diag for StderrDiag {
    fn info(&mut self, msg: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[info] {}", msg);
    }

    fn warn(&mut self, msg: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[warn] {}", msg);
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullDiag;

impl Diag for NullDiag {
    fn info(&mut self, _msg: &str) {}

    fn warn(&mut self, _msg: &str) {}
}

/// Sink that records messages in memory, for inspection in tests
#[derive(Debug, Default)]
pub struct MemoryDiag {
    pub infos: Vec<String>,
    pub warns: Vec<String>,
}

impl Diag for MemoryDiag {
    fn info(&mut self, msg: &str) {
        self.infos.push(msg.to_string());
    }

    fn warn(&mut self, msg: &str) {
        self.warns.push(msg.to_string());
    }
}
