//! Terminal presentation of query results.

use std::io::{self, Write};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print the result set for one query, with match count and timing.
/// Lines are sorted for stable output; the engine's result is an unordered
/// set.
pub fn print_results(query: &str, lines: &mut Vec<String>, elapsed: Duration) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(stdout, "{}", query)?;
    stdout.reset()?;

    if lines.is_empty() {
        writeln!(stdout, ": no results ({:.4}s)", elapsed.as_secs_f64())?;
        return Ok(());
    }

    writeln!(
        stdout,
        ": {} results ({:.4}s)",
        lines.len(),
        elapsed.as_secs_f64()
    )?;

    lines.sort_unstable();
    for line in lines {
        writeln!(stdout, "{}", line)?;
    }

    Ok(())
}
