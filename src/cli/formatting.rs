//! Formatting utilities for CLI output.

use crate::coordinator::ConfigChange;

/// ANSI color codes for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";

    /// Red color
    pub const RED: &'static str = "\x1b[31m";
    /// Green color
    pub const GREEN: &'static str = "\x1b[32m";
    /// Yellow color
    pub const YELLOW: &'static str = "\x1b[33m";
    /// Blue color
    pub const BLUE: &'static str = "\x1b[34m";
    /// Cyan color
    pub const CYAN: &'static str = "\x1b[36m";
}

/// Formats section headers with styling
pub fn format_header(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::CYAN, text, Colors::RESET)
}

/// Formats subheaders with styling
pub fn format_subheader(text: &str) -> String {
    format!(
        "{}{}{}{}",
        Colors::BOLD,
        Colors::YELLOW,
        text,
        Colors::RESET
    )
}

/// Formats command names with styling
pub fn format_command(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::GREEN, text, Colors::RESET)
}

/// Formats category names with styling
pub fn format_category(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::BLUE, text, Colors::RESET)
}

/// Formats descriptions with muted styling
pub fn format_description(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats usage examples with styling
pub fn format_usage(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats error messages with red styling
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}

/// Formats a configuration value for display.
///
/// Missing values print as `<unset>`; lists (`;`-separated) show their
/// element count after the value.
///
/// # Examples
///
/// ```
/// use fleetconf::cli::formatting::format_value;
///
/// assert_eq!(format_value(Some("8081")), "\"8081\"");
/// assert_eq!(format_value(Some("a;b")), "\"a;b\" [2]");
/// assert_eq!(format_value(None), "<unset>");
/// ```
pub fn format_value(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "<unset>".to_string();
    };

    let items = crate::tree::typed::split_list(value);
    if items.len() > 1 {
        format!("\"{value}\" [{}]", items.len())
    } else {
        format!("\"{value}\"")
    }
}

/// Formats one subscription event as a block of `key -> value` lines.
pub fn format_change(change: &ConfigChange) -> String {
    let header = format!(
        "[{}] {}",
        change.timestamp.format("%H:%M:%S"),
        change.prefix
    );

    let lines: Vec<String> = match &change.keys {
        None => vec!["  (all keys)".to_string()],
        Some(keys) => keys
            .iter()
            .map(|key| format!("  {key} -> {}", format_value(change.snapshot.get(key))))
            .collect(),
    };

    format!("{}\n{}", format_subheader(&header), lines.join("\n"))
}
