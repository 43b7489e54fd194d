use super::{Exclusions, ReportData};
use super::{DurationRow, FrequencyRow, HourlySnapshot, TimespanSnapshot};
use crate::convert::to_datetime;
use crate::pipeline::{AnalysisReport, RunSummary};
use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use std::fmt::Write as _;

const BAR_WIDTH: f64 = 40.0;

/// Table with the look shared by every report section
pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    // follow the same color decision as the rest of the output
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
    table
}

/// Pretty-printed JSON of the whole analysis
pub fn format_analysis_json(analysis: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(analysis)
}

/// Human readable report; `limit` caps the rows of frequency and duration tables
pub fn format_analysis_text(analysis: &AnalysisReport, limit: Option<usize>) -> String {
    let mut out = String::new();
    write_summary(&mut out, &analysis.summary);

    for report in &analysis.reports {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", report.title.bold().bright_white());
        match &report.data {
            ReportData::Frequency { rows, total } => write_frequency(&mut out, rows, *total, limit),
            ReportData::Duration { rows } => write_duration(&mut out, rows, limit),
            ReportData::Timespan(span) => write_timespan(&mut out, span),
            ReportData::HourlySpread(spread) => write_hourly(&mut out, spread),
        }
        write_exclusions(&mut out, &report.excluded);
    }
    out
}

fn write_summary(out: &mut String, summary: &RunSummary) {
    let totals = &summary.totals;
    let requests = &totals.requests;

    let _ = writeln!(out, "{}", "REQUEST LOG ANALYSIS".bold().bright_white());
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(
        out,
        "Lines:     {} read, {} matched, {} unmatched, {} blank",
        totals.lines.to_string().green().bold(),
        totals.matched_lines,
        totals.unmatched_lines,
        totals.blank_lines
    );
    let _ = writeln!(
        out,
        "Requests:  {} completed, {} incomplete, {} orphan",
        requests.completed.to_string().green().bold(),
        highlight(requests.incomplete),
        requests.orphan
    );
    if requests.stray_body_lines > 0 {
        let _ = writeln!(
            out,
            "Body lines outside a request: {}",
            requests.stray_body_lines.to_string().yellow()
        );
    }
    if totals.conversion_failures > 0 {
        let _ = writeln!(
            out,
            "Conversion failures: {}",
            totals.conversion_failures.to_string().yellow()
        );
        for (line_type, count) in &totals.conversion_failures_by_line_type {
            let _ = writeln!(out, "  {line_type}: {count}");
        }
    }
    for source in summary.sources.iter().filter(|s| s.error.is_some()) {
        let _ = writeln!(
            out,
            "{} {}",
            "Skipped:".red().bold(),
            source.error.as_deref().unwrap_or(&source.source)
        );
    }
    if summary.cancelled {
        let _ = writeln!(out, "{}", "Run was cancelled; results are partial".yellow());
    }
}

fn highlight(count: usize) -> String {
    if count > 0 {
        count.to_string().yellow().to_string()
    } else {
        count.to_string()
    }
}

fn write_frequency(out: &mut String, rows: &[FrequencyRow], total: u64, limit: Option<usize>) {
    if rows.is_empty() {
        let _ = writeln!(out, "  {}", "no requests".dimmed());
        return;
    }

    let mut table = create_styled_table(&["Category", "Hits", "Share", "Distribution"]);
    for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        table.add_row(vec![
            Cell::new(&row.category),
            Cell::new(row.count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:>6.2}%", row.share * 100.0)),
            Cell::new(bar(row.share)),
        ]);
    }
    let _ = writeln!(out, "{table}");
    write_truncation(out, rows.len(), limit);
    let _ = writeln!(out, "Total: {total}");
}

fn write_duration(out: &mut String, rows: &[DurationRow], limit: Option<usize>) {
    if rows.is_empty() {
        let _ = writeln!(out, "  {}", "no requests".dimmed());
        return;
    }

    let mut table =
        create_styled_table(&["Category", "Hits", "Sum", "Mean", "StdDev", "Min", "Max"]);
    for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        table.add_row(vec![
            Cell::new(&row.category),
            Cell::new(row.count).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(row.sum)).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(row.mean)).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(row.std_dev)).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(row.min)).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(row.max)).set_alignment(CellAlignment::Right),
        ]);
    }
    let _ = writeln!(out, "{table}");
    write_truncation(out, rows.len(), limit);
}

fn write_timespan(out: &mut String, span: &TimespanSnapshot) {
    let _ = writeln!(out, "  First request: {}", format_timestamp(span.first));
    let _ = writeln!(out, "  Last request:  {}", format_timestamp(span.last));
    if let Some(seconds) = span.seconds {
        let _ = writeln!(
            out,
            "  Total time:    {}",
            format_span(seconds).green()
        );
    }
}

fn write_hourly(out: &mut String, spread: &HourlySnapshot) {
    if spread.total == 0 {
        let _ = writeln!(out, "  {}", "no requests".dimmed());
        return;
    }

    let mut table = create_styled_table(&["Hour", "Hits", "Share", "Distribution"]);
    for (hour, &count) in spread.buckets.iter().enumerate() {
        let share = count as f64 / spread.total as f64;
        table.add_row(vec![
            Cell::new(format!("{hour:02}:00 - {:02}:00", (hour + 1) % 24)),
            Cell::new(count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:>6.2}%", share * 100.0)),
            Cell::new(bar(share)),
        ]);
    }
    let _ = writeln!(out, "{table}");
}

fn write_exclusions(out: &mut String, excluded: &Exclusions) {
    let mut parts = Vec::new();
    if excluded.filtered > 0 {
        parts.push(format!("{} filtered", excluded.filtered));
    }
    if excluded.missing_value > 0 {
        parts.push(format!("{} without value", excluded.missing_value));
    }
    if excluded.errors > 0 {
        parts.push(format!("{} failed to evaluate", excluded.errors));
    }
    if !parts.is_empty() {
        let _ = writeln!(out, "{}", format!("Excluded: {}", parts.join(", ")).dimmed());
    }
}

fn write_truncation(out: &mut String, rows: usize, limit: Option<usize>) {
    if let Some(limit) = limit.filter(|&l| rows > l) {
        let _ = writeln!(out, "... and {} more", rows - limit);
    }
}

fn bar(share: f64) -> String {
    "█".repeat((share * BAR_WIDTH).round() as usize)
}

/// Seconds rendered with a unit that keeps a few significant digits
pub(crate) fn format_seconds(seconds: f64) -> String {
    if seconds >= 1.0 {
        format!("{seconds:.2}s")
    } else {
        format!("{:.1}ms", seconds * 1000.0)
    }
}

fn format_timestamp(canonical: Option<u64>) -> String {
    match canonical.and_then(to_datetime) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

fn format_span(seconds: i64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3600;
    let minutes = seconds % 3600 / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CategoryKey;
    use crate::report::ReportSnapshot;

    #[test]
    fn formats_durations_and_spans() {
        assert_eq!(format_seconds(2.5), "2.50s");
        assert_eq!(format_seconds(0.0125), "12.5ms");
        assert_eq!(format_span(7200), "02:00:00");
        assert_eq!(format_span(90_061), "1d 01:01:01");
        assert_eq!(format_timestamp(Some(20150202133308)), "2015-02-02 13:33:08");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn text_report_lists_rows_and_truncates() {
        colored::control::set_override(false);
        let analysis = AnalysisReport {
            summary: RunSummary::default(),
            reports: vec![ReportSnapshot {
                title: "Most requested".to_string(),
                category: Some("action".to_string()),
                field: None,
                data: ReportData::Frequency {
                    total: 3,
                    rows: vec![
                        FrequencyRow {
                            category: CategoryKey::value("show"),
                            count: 2,
                            share: 2.0 / 3.0,
                        },
                        FrequencyRow {
                            category: CategoryKey::Absent,
                            count: 1,
                            share: 1.0 / 3.0,
                        },
                    ],
                },
                excluded: Exclusions {
                    filtered: 4,
                    ..Exclusions::default()
                },
            }],
        };

        let text = format_analysis_text(&analysis, Some(1));
        assert!(text.contains("REQUEST LOG ANALYSIS"));
        assert!(text.contains("Most requested"));
        assert!(text.contains("show"));
        assert!(!text.contains("(absent)"));
        assert!(text.contains("... and 1 more"));
        assert!(text.contains("Excluded: 4 filtered"));
    }
}
