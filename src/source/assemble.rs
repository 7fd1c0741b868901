//! Turning raw lines into log entries.

use crate::model::{EntryId, LogEntry};

/// Assigns ids and joins continuation lines.
///
/// Ids are zero-padded sequence numbers, so they sort in arrival order both
/// numerically and lexically.
#[derive(Debug, Default)]
pub struct EntryAssembler {
    next_seq: u64,
}

impl EntryAssembler {
    /// Start numbering at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build entries from one batch of lines read together.
    ///
    /// A line starting with whitespace is appended (after a `\n`) to the
    /// entry before it in the same batch. Such a line at the start of a
    /// batch becomes an entry of its own. Trailing `\r` is dropped.
    pub fn assemble<I, S>(&mut self, lines: I, timestamp: i64) -> Vec<LogEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut texts: Vec<String> = Vec::new();
        for line in lines {
            let line = line.as_ref().trim_end_matches(['\n', '\r']);
            let continues = line.starts_with(char::is_whitespace);
            match texts.last_mut() {
                Some(previous) if continues => {
                    previous.push('\n');
                    previous.push_str(line);
                }
                _ => texts.push(line.to_string()),
            }
        }

        texts
            .into_iter()
            .map(|text| {
                let id = EntryId::from_sequence(self.next_seq);
                self.next_seq += 1;
                LogEntry::new(id, text, timestamp)
            })
            .collect()
    }

    /// Number of entries produced so far.
    pub fn produced(&self) -> u64 {
        self.next_seq
    }
}
