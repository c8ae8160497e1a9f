//! Error conversion helpers for stream I/O
//!
//! Provides an extension trait attaching context to `io::Result`.

use std::io;

use crate::application::error::{Error, Result};

/// Extension trait for converting `io::Result` to the engine's `Result` with context.
pub trait IoResultExt<T> {
    /// Add context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// writeln!(out, "{}", line).io_context("write help")?;
    /// ```
    fn io_context(self, action: &str) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context(self, action: &str) -> Result<T> {
        self.map_err(|e| Error::Io {
            context: action.to_string(),
            source: e,
        })
    }
}
