//! Terminal output: coloured status lines, progress bars and tables.

pub mod formatter;
pub mod progress;

use colored::Colorize;

pub use formatter::OutputFormatter;
pub use progress::{ProgressIndicator, Spinner};

pub struct UIManager {
    pub formatter: OutputFormatter,
    pub progress: ProgressIndicator,
    colors_enabled: bool,
}

impl UIManager {
    pub fn new(colors_enabled: bool) -> Self {
        if !colors_enabled {
            colored::control::set_override(false);
        }
        Self {
            formatter: OutputFormatter::new(),
            progress: ProgressIndicator::new(colors_enabled),
            colors_enabled,
        }
    }

    pub fn colors_enabled(&self) -> bool {
        self.colors_enabled
    }

    pub fn print_header(&self, title: &str) {
        let rule = "─".repeat(title.chars().count() + 4);
        println!("\n{}", rule.dimmed());
        println!("  {}", title.bold().cyan());
        println!("{}", rule.dimmed());
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_error_with_suggestions(&self, message: &str, suggestion: Option<&str>) {
        self.print_error(message);
        if let Some(suggestion) = suggestion {
            eprintln!("  {} {}", "hint:".dimmed(), suggestion);
        }
    }

    /// `key: value` line with the key dimmed.
    pub fn print_field(&self, key: &str, value: impl std::fmt::Display) {
        println!("  {} {}", format!("{}:", key).dimmed(), value);
    }
}
