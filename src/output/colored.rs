//! Colored formatter implementation with terminal color support
//!
//! Same layout as the plain formatter, with ANSI colors keyed to loss
//! severity and latency.

use super::formatter::{
    fmt_err, format_duration, latency_line, status_rows, status_table_format, FormattingOptions, OutputFormatter,
    PlainFormatter, RowData,
};
use crate::{
    error::Result,
    models::AttemptStatus,
    stats::{OrderingMetrics, SummaryStats},
};
use colored::*;
use std::fmt::Write as _;

/// Loss severity for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossLevel {
    None,     // 0%
    Minor,    // < 1%
    Moderate, // < 5%
    Severe,   // >= 5%
}

impl LossLevel {
    pub fn from_percentage(loss_percentage: f64) -> Self {
        if loss_percentage <= 0.0 {
            Self::None
        } else if loss_percentage < 1.0 {
            Self::Minor
        } else if loss_percentage < 5.0 {
            Self::Moderate
        } else {
            Self::Severe
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::None => Color::Green,
            Self::Minor => Color::Cyan,
            Self::Moderate => Color::Yellow,
            Self::Severe => Color::Red,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No loss",
            Self::Minor => "Minor loss",
            Self::Moderate => "Moderate loss",
            Self::Severe => "Severe loss",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn section_header(&self, title: &str) -> String {
        if self.options.enable_color {
            title.bold().color(self.color_scheme.header).to_string()
        } else {
            title.to_string()
        }
    }

    fn status_color(&self, status: AttemptStatus) -> Color {
        match status {
            AttemptStatus::Success => self.color_scheme.success,
            AttemptStatus::Timeout | AttemptStatus::PortClosed | AttemptStatus::ConnectionError => {
                self.color_scheme.error
            }
            AttemptStatus::Error => self.color_scheme.error,
            _ => self.color_scheme.warning,
        }
    }

    /// Loss bar, one cell per 5%
    fn loss_bar(&self, loss_percentage: f64) -> String {
        let width = 20;
        let filled = ((loss_percentage / 100.0) * width as f64).ceil().clamp(0.0, width as f64) as usize;
        let empty = width - filled;
        let color = LossLevel::from_percentage(loss_percentage).color();

        if self.options.enable_color {
            format!("[{}{}]", "█".repeat(filled).color(color), "░".repeat(empty).color(self.color_scheme.muted))
        } else {
            format!("[{}{}]", "#".repeat(filled), ".".repeat(empty))
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.muted)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.section_header(title)).map_err(fmt_err)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.muted)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_run_info(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.section_header("Run Information")).map_err(fmt_err)?;
        writeln!(output, "  Target:          {}", self.colorize(&stats.target, self.color_scheme.info)).map_err(fmt_err)?;
        writeln!(output, "  Protocol:        {} ({})", stats.protocol_mode, stats.concurrency_mode).map_err(fmt_err)?;
        writeln!(output, "  Connection Type: {}", stats.connection_type).map_err(fmt_err)?;
        writeln!(
            output,
            "  Started:         {}",
            self.colorize(
                &stats.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                self.color_scheme.muted
            )
        )
        .map_err(fmt_err)?;
        write!(output, "  Duration:        {}", format_duration(stats.duration_seconds)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_status_counts(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();
        let rows = status_rows(stats, self.options.show_empty_statuses);

        writeln!(output, "{}", self.section_header(&format!("Attempts ({})", stats.num_tests))).map_err(fmt_err)?;

        // Padding is computed on plain text, so color the rendered label afterwards
        let plain_rows: Vec<RowData> = rows.iter().map(|(_, row)| row.clone()).collect();
        let table = PlainFormatter::create_table(&status_table_format(self.options.table_borders), &plain_rows);
        let first_row = if self.options.table_borders { 3 } else { 1 };
        for (idx, line) in table.lines().enumerate() {
            let styled = match idx.checked_sub(first_row).and_then(|i| rows.get(i)) {
                Some((status, row)) if self.options.enable_color => {
                    let label = row[0].as_str();
                    line.replacen(label, &label.color(self.status_color(*status)).to_string(), 1)
                }
                _ => line.to_string(),
            };
            writeln!(output, "{}", styled).map_err(fmt_err)?;
        }

        let level = LossLevel::from_percentage(stats.loss_percentage);
        write!(
            output,
            "Lost packets: {} {} {}",
            self.colorize(
                &format!("{} ({:.2}%)", stats.loss_count, stats.loss_percentage),
                level.color()
            ),
            self.loss_bar(stats.loss_percentage),
            self.colorize(level.description(), level.color())
        )
        .map_err(fmt_err)?;

        Ok(output)
    }

    fn format_latency(&self, stats: &SummaryStats) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.section_header("Latency")).map_err(fmt_err)?;
        let line = latency_line(stats);
        let color = if stats.latency.is_some() {
            self.color_scheme.info
        } else {
            self.color_scheme.muted
        };
        writeln!(output, "  {}", self.colorize(&line, color)).map_err(fmt_err)?;

        if let Some(ref latency) = stats.latency {
            writeln!(
                output,
                "  P95: {:.2} ms | P99: {:.2} ms | Std Dev: {:.2} ms",
                latency.p95_ms, latency.p99_ms, latency.std_dev_ms
            )
            .map_err(fmt_err)?;
        }

        let retry_color = if stats.total_retries > 0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.muted
        };
        write!(
            output,
            "  Total retries: {}",
            self.colorize(&stats.total_retries.to_string(), retry_color)
        )
        .map_err(fmt_err)?;

        Ok(output)
    }

    fn format_ordering(&self, ordering: &OrderingMetrics, num_tests: u32) -> Result<String> {
        let mut output = String::new();

        let color = if ordering.is_ordered() {
            self.color_scheme.success
        } else {
            self.color_scheme.warning
        };

        writeln!(output, "{}", self.section_header("Completion Order")).map_err(fmt_err)?;
        writeln!(
            output,
            "  Out of order: {} of {}",
            self.colorize(&ordering.out_of_order_count.to_string(), color),
            num_tests
        )
        .map_err(fmt_err)?;
        writeln!(output, "  Inversions:   {}", self.colorize(&ordering.inversions.to_string(), color)).map_err(fmt_err)?;
        write!(
            output,
            "  LIS length:   {} (disorder {})",
            ordering.lis_length,
            self.colorize(&ordering.lis_disorder.to_string(), color)
        )
        .map_err(fmt_err)?;

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("✗ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("⚠ {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✓ {}", self.colorize(message, self.color_scheme.success)))
    }
}

impl ColoredFormatter {
    /// Check if terminal supports colors
    pub fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && std::env::var("TERM").map(|term| term != "dumb").unwrap_or(true)
    }
}
