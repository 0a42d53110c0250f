// Report rendering - assembles sections into the final markdown or JSON

use super::sections;
use super::CycleReport;
use crate::error::Result;
use crate::orderbook::Side;

/// Render a cycle report as markdown
pub fn render_markdown(report: &CycleReport) -> String {
    let mut markdown = sections::build_cycle_header(report);
    markdown.push_str(&sections::build_side_statistics_section(
        Side::Bid,
        &report.bids,
    ));
    markdown.push_str(&sections::build_side_statistics_section(
        Side::Ask,
        &report.asks,
    ));
    markdown.push_str(&sections::build_instruments_section(&report.instruments));
    markdown
}

/// Render a cycle report as pretty-printed JSON
pub fn render_json(report: &CycleReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
