//! CLI layer: help pages, listings and coloured diagnostics

pub mod help;
pub mod listing;
pub mod output;

pub use help::{render_help, show_help};
pub use listing::{print_commands, print_flags};
