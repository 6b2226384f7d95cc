//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    harness::RunReport,
    models::AttemptStatus,
    stats::{OrderingMetrics, SummaryStats},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Target, protocol, mode and timing of the run
    fn format_run_info(&self, stats: &SummaryStats) -> Result<String>;

    /// Per-status counts and the loss line
    fn format_status_counts(&self, stats: &SummaryStats) -> Result<String>;

    /// Latency line and retry total
    fn format_latency(&self, stats: &SummaryStats) -> Result<String>;

    /// Completion-order disorder of an async run
    fn format_ordering(&self, ordering: &OrderingMetrics, num_tests: u32) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;

    /// Full end-of-run summary
    fn format_report(&self, report: &RunReport) -> Result<String> {
        let stats = &report.stats;
        let mut sections = vec![
            self.format_header("Packet Loss Test Results")?,
            self.format_run_info(stats)?,
            self.format_status_counts(stats)?,
            self.format_latency(stats)?,
        ];

        if let Some(ref ordering) = stats.ordering {
            sections.push(self.format_ordering(ordering, stats.num_tests)?);
        }

        Ok(sections.join("\n\n"))
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// List statuses that never occurred with a zero count
    pub show_empty_statuses: bool,
    /// Show table borders
    pub table_borders: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            show_empty_statuses: false,
            table_borders: true,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Rows of the status table: label, count and share of the run
pub(crate) fn status_rows(stats: &SummaryStats, show_empty: bool) -> Vec<(AttemptStatus, RowData)> {
    AttemptStatus::ALL
        .iter()
        .filter_map(|status| {
            let count = stats.count(*status);
            if count == 0 && !show_empty {
                return None;
            }
            let share = if stats.num_tests == 0 {
                0.0
            } else {
                count as f64 / stats.num_tests as f64 * 100.0
            };
            Some((
                *status,
                vec![status.label().to_string(), count.to_string(), format!("{:.2}%", share)],
            ))
        })
        .collect()
}

pub(crate) fn status_table_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::new("Status", Alignment::Left, 20),
            Column::new("Count", Alignment::Right, 6),
            Column::new("Share", Alignment::Right, 8),
        ],
        show_borders,
    }
}

/// `Mean | Median | Min | Max` line, `N/A` without successes
pub(crate) fn latency_line(stats: &SummaryStats) -> String {
    match stats.latency {
        Some(ref latency) => format!(
            "Mean: {:.2} ms | Median: {:.2} ms | Min: {:.2} ms | Max: {:.2} ms",
            latency.mean_ms, latency.median_ms, latency.min_ms, latency.max_ms
        ),
        None => "Mean: N/A | Median: N/A | Min: N/A | Max: N/A".to_string(),
    }
}

/// Format duration in human-readable format
pub(crate) fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0} ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.2} s", seconds)
    } else {
        let minutes = (seconds / 60.0) as u32;
        format!("{}m{:.1}s", minutes, seconds % 60.0)
    }
}

pub(crate) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(format: &TableFormat, rows: &[RowData]) -> String {
        let widths = Self::calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_borders {
            output.push_str(&Self::create_horizontal_border(&widths));
            output.push('\n');
        }

        let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
        output.push_str(&Self::create_row(&headers, &widths, format));
        output.push('\n');

        if format.show_borders {
            output.push_str(&Self::create_horizontal_border(&widths));
            output.push('\n');
        }

        for row in rows {
            output.push_str(&Self::create_row(row, &widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&Self::create_horizontal_border(&widths));
        }

        output.trim_end().to_string()
    }

    fn calculate_column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                rows.iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .fold(column.min_width.max(column.header.len()), usize::max)
            })
            .collect()
    }

    fn create_row(data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map(|c| c.alignment).unwrap_or(Alignment::Left);
            let padded_cell = Self::align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
                row.push_str(&padded_cell);
                row.push_str(" |");
            } else {
                row.push_str(&padded_cell);
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(widths: &[usize]) -> String {
        let mut border = String::from("+");
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
        border
    }

    fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
        match alignment {
            Alignment::Left => format!("{:<width$}", text, width = width),
            Alignment::Right => format!("{:>width$}", text, width = width),
        }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_run_info(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Run Information:").map_err(fmt_err)?;
        writeln!(output, "----------------").map_err(fmt_err)?;
        writeln!(output, "Target:           {}", stats.target).map_err(fmt_err)?;
        writeln!(output, "Protocol:         {}", stats.protocol_mode).map_err(fmt_err)?;
        writeln!(output, "Mode:             {}", stats.concurrency_mode).map_err(fmt_err)?;
        writeln!(output, "Connection Type:  {}", stats.connection_type).map_err(fmt_err)?;
        writeln!(output, "Started:          {}", stats.start_time.format("%Y-%m-%d %H:%M:%S UTC")).map_err(fmt_err)?;
        write!(output, "Duration:         {}", format_duration(stats.duration_seconds)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_status_counts(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();

        let rows: Vec<RowData> = status_rows(stats, self.options.show_empty_statuses)
            .into_iter()
            .map(|(_, row)| row)
            .collect();

        writeln!(output, "Attempts: {}", stats.num_tests).map_err(fmt_err)?;
        writeln!(output, "{}", Self::create_table(&status_table_format(self.options.table_borders), &rows))
            .map_err(fmt_err)?;
        write!(output, "Lost packets: {} ({:.2}%)", stats.loss_count, stats.loss_percentage).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_latency(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Latency: {}", latency_line(stats)).map_err(fmt_err)?;
        if let Some(ref latency) = stats.latency {
            writeln!(
                output,
                "P95: {:.2} ms | P99: {:.2} ms | Std Dev: {:.2} ms",
                latency.p95_ms, latency.p99_ms, latency.std_dev_ms
            )
            .map_err(fmt_err)?;
        }
        write!(output, "Total retries: {}", stats.total_retries).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_ordering(&self, ordering: &OrderingMetrics, num_tests: u32) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Completion Order:").map_err(fmt_err)?;
        writeln!(output, "-----------------").map_err(fmt_err)?;
        writeln!(output, "Out of order:     {} of {}", ordering.out_of_order_count, num_tests).map_err(fmt_err)?;
        writeln!(output, "Inversions:       {}", ordering.inversions).map_err(fmt_err)?;
        writeln!(output, "LIS length:       {}", ordering.lis_length).map_err(fmt_err)?;
        write!(output, "LIS disorder:     {}", ordering.lis_disorder).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("OK: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttemptRecord;
    use crate::stats::RunMetadata;
    use crate::types::{ConcurrencyMode, ProtocolMode};
    use chrono::Utc;

    fn report(statuses: &[AttemptStatus], mode: ConcurrencyMode) -> RunReport {
        let records: Vec<AttemptRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let elapsed = status.received_response().then_some(10.0 + i as f64);
                AttemptRecord::new(i as u32 + 1, Utc::now(), *status, elapsed, "", 0)
            })
            .collect();
        let metadata = RunMetadata {
            target: "10.0.0.5:5000".to_string(),
            protocol_mode: ProtocolMode::Tcp,
            concurrency_mode: mode,
            connection_type: "wifi".to_string(),
        };
        let stats = SummaryStats::from_records(metadata, &records, Utc::now(), Utc::now());
        RunReport {
            records,
            stats,
            reference_bytes: Some(64),
        }
    }

    fn plain() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_summary_contains_loss_and_latency() {
        let report = report(
            &[AttemptStatus::Success, AttemptStatus::Timeout, AttemptStatus::Success, AttemptStatus::Success],
            ConcurrencyMode::Sync,
        );

        let text = plain().format_report(&report).unwrap();

        assert!(text.contains("Packet Loss Test Results"));
        assert!(text.contains("Target:           10.0.0.5:5000"));
        assert!(text.contains("Lost packets: 1 (25.00%)"));
        assert!(text.contains("Mean: 11.67 ms | Median: 12.00 ms | Min: 10.00 ms | Max: 13.00 ms"));
        assert!(text.contains("Timeout"));
        assert!(!text.contains("Completion Order"));
    }

    #[test]
    fn test_no_successes_reports_na() {
        let report = report(&[AttemptStatus::PortClosed, AttemptStatus::PortClosed], ConcurrencyMode::Sync);

        let text = plain().format_report(&report).unwrap();

        assert!(text.contains("Mean: N/A | Median: N/A | Min: N/A | Max: N/A"));
        assert!(text.contains("Lost packets: 2 (100.00%)"));
        assert!(!text.contains("P95"));
    }

    #[test]
    fn test_async_summary_includes_ordering() {
        let report = report(&[AttemptStatus::Success; 3], ConcurrencyMode::Async);

        let text = plain().format_report(&report).unwrap();

        assert!(text.contains("Completion Order"));
        assert!(text.contains("Inversions:       0"));
    }

    #[test]
    fn test_status_table_hides_empty_rows() {
        let report = report(&[AttemptStatus::Success, AttemptStatus::WrongSequence], ConcurrencyMode::Sync);

        let table = plain().format_status_counts(&report.stats).unwrap();
        assert!(table.contains("Wrong Sequence"));
        assert!(!table.contains("Empty Response"));

        let verbose = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            show_empty_statuses: true,
            table_borders: false,
        });
        let table = verbose.format_status_counts(&report.stats).unwrap();
        assert!(table.contains("Empty Response"));
        assert!(!table.contains('+'));
    }

    #[test]
    fn test_table_alignment() {
        let format = status_table_format(true);
        let rows = vec![vec!["Success".to_string(), "7".to_string(), "70.00%".to_string()]];

        let table = PlainFormatter::create_table(&format, &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("+-"));
        assert!(lines[3].starts_with("| Success "));
        assert!(lines[3].ends_with("70.00% |"));
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.25), "250 ms");
        assert_eq!(format_duration(12.5), "12.50 s");
        assert_eq!(format_duration(125.0), "2m5.0s");
    }
}
