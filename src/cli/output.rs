//! Terminal output formatting

use crate::cli::args::VerbosityLevel;
use crate::core::table::ExtractionTable;
use crate::error::ResolveError;
use colored::Colorize;
use serde::Serialize;

/// Output formatter for cdn-resolver
///
/// Results go to stdout so they can be piped; everything else goes to stderr.
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "info:".cyan().bold(), message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "done:".green().bold(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print extraction table summary
    pub fn print_table_summary(&self, table: &ExtractionTable) {
        if self.verbosity == VerbosityLevel::Verbose {
            eprintln!(
                "{} {} fragments, {}-character key: {}",
                "table:".blue().bold(),
                table.len(),
                table.key_len(),
                table
            );
        }
    }

    /// Print a result document on stdout
    pub fn print_json<T: Serialize>(&self, value: &T, pretty: bool) -> Result<(), ResolveError> {
        println!("{}", render_json(value, pretty)?);
        Ok(())
    }
}

/// Render a result document as JSON text
pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, ResolveError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}
