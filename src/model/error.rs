//! Error types for logview.
//!
//! Errors are split by how they must be handled:
//!
//! - [`AppError`] - top-level error returned from `main`, wrapping every fatal failure.
//!   - [`InputError`] - ingestion failures (no input, missing file, I/O).
//!   - [`StoreError`] - internal invariant violations inside the log store.
//!   - `std::io::Error` - terminal and export write failures.
//!
//! Malformed filter queries and unparseable log text are deliberately absent
//! from this taxonomy: they never produce an error, they only degrade
//! highlighting or matching quality.

use super::identifiers::EntryId;
use thiserror::Error;

/// Top-level application error encompassing all fatal failure modes.
///
/// Domain-specific errors convert via `From`, so application code composes
/// with `?`.
///
/// # Examples
///
/// ```no_run
/// use logview::model::error::{AppError, InputError};
///
/// fn run_app() -> Result<(), AppError> {
///     let _lines = read_input()?;
///     Ok(())
/// }
/// # fn read_input() -> Result<(), InputError> { Ok(()) }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to read input from stdin.
    #[error("Failed to read input: {0}")]
    Input(#[from] InputError),

    /// The log store detected a broken invariant. Indicates a bug.
    #[error("Log store invariant violated: {0}")]
    Store(#[from] StoreError),

    /// Terminal or file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors encountered while reading log lines from the ingestion feed.
#[derive(Debug, Error)]
pub enum InputError {
    /// Stdin is an interactive terminal; there is nothing to read.
    ///
    /// **Recovery**: print usage and exit; the user forgot to pipe data.
    #[error("No input: pipe log lines into logview's stdin")]
    NoInput,

    /// The input file does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path as given on the command line.
        path: std::path::PathBuf,
    },

    /// The reader thread could not be started.
    #[error("Failed to start input reader: {0}")]
    Spawn(#[source] std::io::Error),

    /// Underlying I/O failure while reading.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invariant violations in the log store.
///
/// These are never caused by user input. They indicate a bug in the caller
/// (asking for an id the store never saw) or in the store itself, and are
/// logged and surfaced loudly rather than recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Lookup of an entry id that was never appended.
    #[error("unknown entry id {id}")]
    UnknownEntry {
        /// The id looked up.
        id: EntryId,
    },

    /// An appended entry reused an id already present in the store.
    #[error("duplicate entry id {id}")]
    DuplicateEntry {
        /// The repeated id.
        id: EntryId,
    },

    /// A visual index at or past the end of the visible universe.
    #[error("visual index {index} out of range (visible count {len})")]
    VisualIndexOutOfRange {
        /// Requested visual index.
        index: usize,
        /// Visible count at the time.
        len: usize,
    },

    /// The filtered view points past the end of the entry list.
    #[error("filtered view index {index} out of bounds (entry count {len})")]
    FilteredIndexOutOfBounds {
        /// Entry index held by the filtered view.
        index: usize,
        /// Number of stored entries.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_app_error() {
        fn fails() -> Result<(), AppError> {
            Err(StoreError::UnknownEntry {
                id: EntryId::new("9").unwrap(),
            })?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(err.to_string().contains("unknown entry id 9"));
    }

    #[test]
    fn io_error_converts_into_input_error() {
        let err: InputError = std::io::Error::other("broken pipe").into();
        assert!(err.to_string().contains("broken pipe"));
    }

    #[test]
    fn out_of_range_message_includes_bounds() {
        let err = StoreError::VisualIndexOutOfRange { index: 5, len: 3 };
        assert_eq!(
            err.to_string(),
            "visual index 5 out of range (visible count 3)"
        );
    }
}
