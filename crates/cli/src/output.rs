//! Terminal output
//!
//! Status lines go to stdout, problems to stderr. A quiet printer only lets
//! warnings and errors through.

use owo_colors::OwoColorize;

/// Status line printer
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    quiet: bool,
}

impl Printer {
    /// Create a printer; `quiet` suppresses everything below warnings
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Whether informational output is suppressed
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "✓".green(), message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "ℹ".blue(), message);
        }
    }

    /// Print a header
    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!();
            println!("{}", message.bold());
            println!("{}", "─".repeat(message.chars().count()));
        }
    }

    /// Print an aligned `label: value` line
    pub fn field(&self, label: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {}", format!("{}:", label).dimmed(), value);
        }
    }

    /// Print a package path with the dependency that supplies it
    pub fn mapping(&self, path: &str, origin: &str, note: Option<&str>) {
        if self.quiet {
            return;
        }
        match note {
            Some(note) => println!("  {} {} {} {}", path, "←".dimmed(), origin.cyan(), note.dimmed()),
            None => println!("  {} {} {}", path, "←".dimmed(), origin.cyan()),
        }
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    let noun = if count == 1 { singular } else { plural };
    format!("{} {}", count, noun)
}
