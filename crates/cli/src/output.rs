//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use sweep_lib::{DeletionStatus, ResourceRecord};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Warnings shown per record in listings
pub const LISTING_WARNINGS: usize = 2;

/// Warnings shown per record while deleting
pub const DELETION_WARNINGS: usize = 3;

/// One inventory row, numbered in display order
#[derive(Tabled)]
pub struct RecordRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Variant")]
    pub variant: String,
    #[tabled(rename = "Shape")]
    pub shape: String,
    #[tabled(rename = "Age")]
    pub age: String,
    #[tabled(rename = "Monthly")]
    pub monthly: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Warnings")]
    pub warnings: String,
}

impl RecordRow {
    pub fn from_record(position: usize, record: &ResourceRecord) -> Self {
        let shape = if record.is_composite {
            format!("group of {}", record.member_ids.len())
        } else {
            record.shape.shape_tag().unwrap_or("-").to_string()
        };

        let mut status = if record.is_risky() {
            "RISKY".red().to_string()
        } else {
            "SAFE".green().to_string()
        };
        if record.is_inactive() {
            status.push_str(&format!(" {}", "INACTIVE".yellow()));
        }
        if !record.degradations.is_empty() {
            status.push_str(&format!(" {}", "DEGRADED".dimmed()));
        }

        Self {
            position,
            id: record.id.clone(),
            region: record.region.clone(),
            variant: record.variant().unwrap_or("-").to_string(),
            shape,
            age: format!("{}d", record.risk.age_in_days),
            monthly: format_currency(record.monthly_cost_estimate),
            status,
            warnings: summarize_warnings(&record.risk.warnings, LISTING_WARNINGS),
        }
    }
}

/// Render rows as a rounded table
pub fn render_table<T: Tabled>(items: &[T]) -> String {
    if items.is_empty() {
        return "No items found".yellow().to_string();
    }
    Table::new(items).with(Style::rounded()).to_string()
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    println!("{}", render_table(items));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Operator-facing text that is not part of the report
///
/// Goes to stdout with table output and to stderr with JSON output, so a JSON
/// run always leaves a parseable stdout.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    to_stderr: bool,
}

impl Console {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            to_stderr: format == OutputFormat::Json,
        }
    }

    pub fn line(&self, text: &str) {
        if self.to_stderr {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    /// Print without a newline and flush, for prompts
    pub fn prompt(&self, text: &str) -> std::io::Result<()> {
        use std::io::Write;

        if self.to_stderr {
            let mut stderr = std::io::stderr();
            write!(stderr, "{}", text)?;
            stderr.flush()
        } else {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", text)?;
            stdout.flush()
        }
    }

    pub fn info(&self, message: &str) {
        self.line(&format!("{} {}", "ℹ".blue().bold(), message));
    }

    pub fn warning(&self, message: &str) {
        self.line(&format!("{} {}", "⚠".yellow().bold(), message));
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// First `limit` warnings, with a count of the rest
pub fn summarize_warnings(warnings: &[String], limit: usize) -> String {
    if warnings.is_empty() {
        return "-".to_string();
    }
    let mut shown = warnings.iter().take(limit).cloned().collect::<Vec<_>>().join("; ");
    if warnings.len() > limit {
        shown.push_str(&format!(" (+{} more)", warnings.len() - limit));
    }
    shown
}

/// Color a deletion status
pub fn color_status(status: DeletionStatus, dry_run: bool) -> String {
    match status {
        DeletionStatus::Deleted if dry_run => "would delete".blue().to_string(),
        DeletionStatus::Deleted => "deleted".green().to_string(),
        DeletionStatus::AlreadyGone => "already gone".green().to_string(),
        DeletionStatus::Failed => "failed".red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_warnings() {
        let warnings = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(summarize_warnings(&warnings, 2), "a; b (+1 more)");
        assert_eq!(summarize_warnings(&warnings, 3), "a; b; c");
        assert_eq!(summarize_warnings(&[], 2), "-");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(40.0), "$40.00");
        assert_eq!(format_currency(1234.567), "$1234.57");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
