//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically. Helpers that
//! return strings take an explicit `color` switch so injected streams can be
//! kept plain.

use colored::Colorize;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Uppercased section header with trailing colon, e.g. `USAGE:`.
pub fn header(text: &str, color: bool) -> String {
    let s = format!("{}:", text.to_uppercase());
    if color {
        s.cyan().bold().to_string()
    } else {
        s
    }
}

/// Command and flag names.
pub fn keyword(text: &str, color: bool) -> String {
    if color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

/// Secondary details: types, defaults, env names.
pub fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Deprecation markers.
pub fn warn(text: &str, color: bool) -> String {
    if color {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_helpers_do_not_colour() {
        assert_eq!(header("usage", false), "USAGE:");
        assert_eq!(keyword("--help", false), "--help");
        assert_eq!(dim("bool", false), "bool");
    }
}
