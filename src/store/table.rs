use std::fmt::Write;

use crate::record::Record;

const TITLE_WIDTH: usize = 32;

/// Compact fixed-width listing for the terminal.
pub fn render(records: &[Record]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3} | {:<32} | {:<10} | {:<25} | {:>3} | {}",
        "#", "Title", "Date", "Start", "Get", "HLS URL"
    );
    let _ = writeln!(out, "{}", "-".repeat(110));

    for (i, r) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3} | {:<32} | {:<10} | {:<25} | {:>3} | {}",
            i + 1,
            truncate(&r.title, TITLE_WIDTH),
            r.broadcast_date,
            r.broadcast_start,
            r.get,
            r.hls_url
        );
    }

    let pending = records.iter().filter(|r| r.get == 0).count();
    let _ = writeln!(out, "\n{} episodes | {} not yet downloaded", records.len(), pending);
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
