//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::Diagnostic;

pub use crate::storage::OutputFormat;

/// Output helper for consistent formatting
///
/// Results go to stdout, everything else to stderr, so that
/// `worklog annotate < in > out` stays a clean filter.
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints structured data (JSON only)
    pub fn data<T: Serialize>(&self, data: &T) {
        if self.format == OutputFormat::Json {
            if let Ok(json) = serde_json::to_string(data) {
                println!("{}", json);
            }
        }
    }

    /// Prints a label/value row (text only)
    pub fn row(&self, label: &str, value: &str) {
        if self.format == OutputFormat::Text {
            println!("{:<14}{}", format!("{}:", label), value);
        }
    }

    /// Prints raw text to stdout, whatever the format
    pub fn text(&self, text: &str) {
        print!("{}", text);
    }

    /// Reports a recoverable problem on stderr
    pub fn warning(&self, diagnostic: &Diagnostic) {
        match self.format {
            OutputFormat::Text => eprintln!("warning: {}", diagnostic),
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(diagnostic) {
                    eprintln!("{}", json);
                }
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
