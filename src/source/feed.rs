//! Background line reader.

use super::assemble::EntryAssembler;
use crate::model::error::InputError;
use crate::model::LogEntry;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, warn};

enum FeedMessage {
    Line(String),
    Failed(io::Error),
    Eof,
}

/// Lines read on a background thread, drained without blocking.
///
/// Each [`poll`](Self::poll) turns whatever arrived since the previous poll
/// into one batch of entries.
pub struct LineFeed {
    messages: Receiver<FeedMessage>,
    assembler: EntryAssembler,
    failed: Option<io::Error>,
    complete: bool,
}

impl LineFeed {
    /// Start reading `reader` on a new thread.
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> Result<Self, InputError> {
        let (tx, messages) = mpsc::channel();
        thread::Builder::new()
            .name("line-reader".to_string())
            .spawn(move || read_lines(BufReader::new(reader), tx))
            .map_err(InputError::Spawn)?;

        Ok(Self {
            messages,
            assembler: EntryAssembler::new(),
            failed: None,
            complete: false,
        })
    }

    /// Entries that arrived since the last poll. Never blocks.
    ///
    /// # Errors
    ///
    /// `InputError::Io` once the reader failed. Lines read before the
    /// failure are returned by the poll preceding the error.
    pub fn poll(&mut self, timestamp: i64) -> Result<Vec<LogEntry>, InputError> {
        if let Some(err) = self.failed.take() {
            return Err(InputError::Io(err));
        }

        let mut lines = Vec::new();
        loop {
            match self.messages.try_recv() {
                Ok(FeedMessage::Line(line)) => lines.push(line),
                Ok(FeedMessage::Failed(err)) => {
                    warn!(%err, "input reader failed");
                    self.complete = true;
                    self.failed = Some(err);
                    break;
                }
                Ok(FeedMessage::Eof) | Err(TryRecvError::Disconnected) => {
                    if !self.complete {
                        debug!("input reached end");
                    }
                    self.complete = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if lines.is_empty() {
            if let Some(err) = self.failed.take() {
                return Err(InputError::Io(err));
            }
        }
        Ok(self.assembler.assemble(lines, timestamp))
    }

    /// True once the input ended or failed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: mpsc::Sender<FeedMessage>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let message = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                let _ = tx.send(FeedMessage::Eof);
                return;
            }
            Ok(_) => FeedMessage::Line(String::from_utf8_lossy(&buf).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(FeedMessage::Failed(err));
                return;
            }
        };
        if tx.send(message).is_err() {
            return;
        }
    }
}
