use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use subline::diag::{Diag, StderrDiag};
use subline::index::stats::show_stats;
use subline::index::store::Index;
use subline::index::types::IndexConfig;
use subline::output::print_results;

#[derive(Parser)]
#[command(name = "subline")]
#[command(about = "Persistent substring search over line-oriented text corpora")]
struct Cli {
    /// Input file with space-separated tokens per line
    #[arg(short = 'f', long = "datafile")]
    datafile: PathBuf,

    /// Force rebuild of the datastore for the file
    #[arg(short = 'b', long = "rebuild")]
    rebuild: bool,

    /// Input lines per shard file
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Show datastore statistics and exit
    #[arg(long)]
    stats: bool,

    /// Queries to run before the interactive prompt
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut diag = StderrDiag;

    let config = IndexConfig {
        batch_size: cli.batch_size,
        progress: true,
    };
    let index = Index::prepare(&cli.datafile, cli.rebuild, config, &mut diag)?;

    if cli.stats {
        show_stats(&index)?;
        return Ok(());
    }

    for query in &cli.query {
        run_query(&index, query, &mut diag)?;
    }

    interactive_loop(&index, &mut diag)
}

/// Read-query-print loop; a single `.` line (or end of input) terminates
fn interactive_loop(index: &Index, diag: &mut dyn Diag) -> Result<()> {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("\n > Enter the search phrase ('.' to stop): ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let query = input.trim();
        if query == "." {
            break;
        }

        run_query(index, query, diag)?;
    }

    Ok(())
}

fn run_query(index: &Index, query: &str, diag: &mut dyn Diag) -> Result<()> {
    let start = Instant::now();
    let results = index.search(query, diag);
    let elapsed = start.elapsed();

    let mut lines: Vec<String> = results.into_iter().collect();
    print_results(query, &mut lines, elapsed)?;
    Ok(())
}
