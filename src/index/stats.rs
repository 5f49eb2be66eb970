use crate::index::store::Index;
use anyhow::Result;

/// Display datastore statistics
pub fn show_stats(index: &Index) -> Result<()> {
    let stats = index.stats()?;

    println!("Datastore Statistics");
    println!("====================");
    println!();
    println!("Source file:      {}", index.input().display());
    println!("Datastore:        {}", stats.shard_dir.display());
    println!("Shard files:      {}", stats.shard_count);
    println!("Total size:       {}", format_size(stats.total_bytes));

    if let Some(meta) = &stats.meta {
        println!();
        println!("Indexed lines:    {}", meta.line_count);
        println!("Batch size:       {}", meta.batch_size);
        println!("Format version:   {}", meta.version);
        println!("Created:          {}", format_timestamp(meta.created_at));
    }

    Ok(())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format unix timestamp
fn format_timestamp(ts: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};
    let datetime = UNIX_EPOCH + Duration::from_secs(ts);
    format!("{:?}", datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
