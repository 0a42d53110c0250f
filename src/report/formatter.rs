// Markdown formatting utilities for cycle reports

/// Build a markdown table from headers and rows
pub fn build_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = String::new();

    // Header row
    table.push_str("| ");
    table.push_str(&headers.join(" | "));
    table.push_str(" |\n");

    // Separator row
    table.push('|');
    for _ in headers {
        table.push_str("--------|");
    }
    table.push('\n');

    // Data rows
    for row in rows {
        table.push_str("| ");
        table.push_str(&row.join(" | "));
        table.push_str(" |\n");
    }

    table
}

/// Build a markdown section header
pub fn build_section_header(title: &str, level: u8) -> String {
    let hashes = "#".repeat(level as usize);
    format!("{} {}\n\n", hashes, title)
}

/// Format a distance or moment with fixed precision
pub fn format_distance(value: f64) -> String {
    if value.is_finite() {
        format!("{:.6}", value)
    } else {
        "n/a".to_string()
    }
}

/// Format a percentile label: 12.5 -> "p12.5", 50 -> "p50"
pub fn format_percentile(percentile: f64) -> String {
    if percentile.fract() == 0.0 {
        format!("p{:.0}", percentile)
    } else {
        format!("p{}", percentile)
    }
}

/// Format a timestamp as ISO 8601 UTC
pub fn format_timestamp(millis: i64) -> String {
    use chrono::{TimeZone, Utc};

    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        _ => format!("{} ms (Unix epoch)", millis),
    }
}

/// Format a DateTime<Utc> as human-readable string
pub fn format_datetime(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
