// Section builders for cycle reports
//
// Each function renders one markdown section from an already-computed report.

use super::formatter;
use super::{CycleReport, InstrumentReport};
use crate::analytics::SideStatistics;
use crate::orderbook::Side;

/// Cycle metadata: id, timing, window and metric
pub fn build_cycle_header(report: &CycleReport) -> String {
    let mut content = formatter::build_section_header("Divergence Cycle", 1);

    let headers = vec!["Metric", "Value"];
    let rows = vec![
        vec!["Cycle".to_string(), report.cycle_id.to_string()],
        vec![
            "Started At".to_string(),
            formatter::format_datetime(report.started_at),
        ],
        vec!["Duration".to_string(), format!("{} ms", report.duration_ms())],
        vec![
            "Window".to_string(),
            format!(
                "-{} ms / +{} ms",
                report.window.before_ms, report.window.after_ms
            ),
        ],
        vec!["Metric".to_string(), format!("{:?}", report.metric).to_lowercase()],
        vec![
            "Instruments".to_string(),
            format!(
                "{} scored, {} empty windows, {} failed",
                report.scored, report.empty_windows, report.failed
            ),
        ],
    ];

    content.push_str(&formatter::build_table(&headers, &rows));
    content.push('\n');
    content
}

/// Moments and percentiles for one side, or "no data"
pub fn build_side_statistics_section(side: Side, statistics: &SideStatistics) -> String {
    let mut content = formatter::build_section_header(&format!("Distance Statistics: {}", side), 2);

    let Some(summary) = statistics.summary() else {
        content.push_str("No data: no instrument produced a candidate on this side.\n\n");
        return content;
    };

    let headers = vec!["Count", "Mean", "Variance", "Third Moment", "Min", "Max"];
    let rows = vec![vec![
        summary.count.to_string(),
        formatter::format_distance(summary.mean),
        formatter::format_distance(summary.variance),
        formatter::format_distance(summary.third_central_moment),
        formatter::format_distance(summary.min),
        formatter::format_distance(summary.max),
    ]];
    content.push_str(&formatter::build_table(&headers, &rows));
    content.push('\n');

    let labels: Vec<String> = summary
        .percentiles
        .iter()
        .map(|p| formatter::format_percentile(p.percentile))
        .collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let values = vec![summary
        .percentiles
        .iter()
        .map(|p| formatter::format_distance(p.value))
        .collect::<Vec<_>>()];
    content.push_str(&formatter::build_table(&label_refs, &values));
    content.push('\n');

    content
}

/// One row per instrument, failures included
pub fn build_instruments_section(instruments: &[InstrumentReport]) -> String {
    let mut content = formatter::build_section_header("Instruments", 2);

    if instruments.is_empty() {
        content.push_str("No instruments in this cycle.\n\n");
        return content;
    }

    let headers = vec![
        "Instrument",
        "Status",
        "Target",
        "Bid Distance",
        "Ask Distance",
        "Events Applied",
    ];
    let rows: Vec<Vec<String>> = instruments
        .iter()
        .map(|report| match report {
            InstrumentReport::Scored(divergence) => {
                let distance = |side: Side| {
                    let result = divergence.result(side);
                    if result.had_candidates {
                        formatter::format_distance(result.distance)
                    } else {
                        "no candidates".to_string()
                    }
                };
                vec![
                    divergence.instrument_id.clone(),
                    "scored".to_string(),
                    formatter::format_timestamp(divergence.target_time),
                    distance(Side::Bid),
                    distance(Side::Ask),
                    divergence.events_applied.to_string(),
                ]
            }
            InstrumentReport::Failed {
                instrument_id,
                error_type,
                ..
            } => vec![
                instrument_id.clone(),
                format!("failed ({})", error_type),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
            ],
        })
        .collect();

    content.push_str(&formatter::build_table(&headers, &rows));
    content.push('\n');
    content
}
