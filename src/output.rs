//! Persists the resumption cursor for the next run.
//!
//! The cursor is appended as a `cursor=<value>` line, the format GitHub
//! Actions reads from the file named by `GITHUB_OUTPUT`. An empty value means
//! the next run starts from the first page.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::github::cursor::OuterCursor;
use crate::github::error::UpvoteError;

/// Output key under which the cursor is published.
pub const CURSOR_KEY: &str = "cursor";

/// Formats the output line for `cursor`.
#[must_use]
pub fn cursor_line(cursor: &OuterCursor) -> String {
    format!("{CURSOR_KEY}={}", cursor.output_value())
}

/// Appends the cursor line to `path`, creating the file if needed.
///
/// # Errors
///
/// Returns [`UpvoteError::Io`] when the file cannot be opened or written.
pub fn write_cursor(path: &Path, cursor: &OuterCursor) -> Result<(), UpvoteError> {
    let io_error = |error: std::io::Error| UpvoteError::Io {
        message: format!("writing cursor to {}: {error}", path.display()),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    writeln!(file, "{}", cursor_line(cursor)).map_err(io_error)
}
