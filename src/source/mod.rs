//! Log input sources.
//!
//! Lines come from a file or from piped stdin and are read on a background
//! thread:
//! - `assemble`: EntryAssembler - ids, timestamps, continuation joining
//! - `feed`: LineFeed - non-blocking drain of lines read so far

use crate::model::error::InputError;
use crate::model::LogEntry;
use std::fs::File;
use std::io::{BufRead, BufReader, IsTerminal, Read};
use std::path::{Path, PathBuf};

pub mod assemble;
pub mod feed;

pub use assemble::EntryAssembler;
pub use feed::LineFeed;

/// Open the input: `file` when given, otherwise piped stdin.
///
/// # Errors
///
/// `InputError::NoInput` when no file is given and stdin is a terminal,
/// `InputError::FileNotFound` when the file does not exist.
pub fn detect_input(file: Option<PathBuf>) -> Result<LineFeed, InputError> {
    match file {
        Some(path) => LineFeed::spawn(open_file(&path)?),
        None => {
            if std::io::stdin().is_terminal() {
                return Err(InputError::NoInput);
            }
            LineFeed::spawn(std::io::stdin())
        }
    }
}

/// Read the whole input synchronously as one batch.
pub fn read_all_from(
    file: Option<PathBuf>,
    timestamp: i64,
) -> Result<Vec<LogEntry>, InputError> {
    match file {
        Some(path) => read_all(open_file(&path)?, timestamp),
        None => {
            if std::io::stdin().is_terminal() {
                return Err(InputError::NoInput);
            }
            read_all(std::io::stdin().lock(), timestamp)
        }
    }
}

/// Read every line of `reader` and assemble them as a single batch.
pub fn read_all<R: Read>(reader: R, timestamp: i64) -> Result<Vec<LogEntry>, InputError> {
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    while reader.read_until(b'\n', &mut buf)? > 0 {
        lines.push(String::from_utf8_lossy(&buf).into_owned());
        buf.clear();
    }
    Ok(EntryAssembler::new().assemble(lines, timestamp))
}

fn open_file(path: &Path) -> Result<File, InputError> {
    if !path.exists() {
        return Err(InputError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(File::open(path)?)
}
