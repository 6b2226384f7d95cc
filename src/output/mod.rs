//! Output formatting and display system
//!
//! Renders the end-of-run summary as colored or plain text and writes the
//! JSON report.

mod colored;
mod formatter;
mod report;

pub use colored::{ColorScheme, ColoredFormatter, LossLevel};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};
pub use report::JsonReportWriter;

use crate::models::Config;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool) -> Box<dyn OutputFormatter> {
        Self::create_with_options(FormattingOptions {
            enable_color,
            ..Default::default()
        })
    }

    /// Verbose runs list every status, including those that never occurred
    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_with_options(FormattingOptions {
            enable_color: config.enable_color && ColoredFormatter::supports_color(),
            show_empty_statuses: config.verbose,
            table_borders: true,
        })
    }

    fn create_with_options(options: FormattingOptions) -> Box<dyn OutputFormatter> {
        if options.enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}
