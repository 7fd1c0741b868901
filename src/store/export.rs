//! Bulk export of stored entries.

use crate::model::LogEntry;
use std::io::{self, Write};

/// Output format for [`export`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Raw text, one entry per line.
    #[default]
    Text,
    /// One JSON object per line (`id`, `raw_text`, `timestamp`).
    JsonLines,
}

/// Write `entries` in order. Returns the number written.
pub fn export<'a, W, I>(entries: I, writer: &mut W, format: ExportFormat) -> io::Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut written = 0;
    for entry in entries {
        match format {
            ExportFormat::Text => writer.write_all(entry.raw_text().as_bytes())?,
            ExportFormat::JsonLines => serde_json::to_writer(&mut *writer, entry)?,
        }
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
