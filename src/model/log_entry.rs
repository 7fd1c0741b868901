//! Immutable log entry as delivered by the ingestion feed.

use super::identifiers::EntryId;
use serde::{Deserialize, Serialize};

/// One record of the log stream.
///
/// Created once and never mutated. `raw_text` may contain embedded newlines
/// when the ingestion side joined continuation lines onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    id: EntryId,
    raw_text: String,
    /// Arrival time in epoch milliseconds.
    timestamp: i64,
}

impl LogEntry {
    /// Create an entry received at `timestamp` (milliseconds since the epoch).
    pub fn new(id: EntryId, raw_text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            timestamp,
        }
    }

    /// Unique, stable id.
    pub fn id(&self) -> &EntryId {
        &self.id
    }

    /// The line exactly as received, escape sequences included.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Arrival time in milliseconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Timestamp as a UTC date-time, if it is in chrono's representable range.
    pub fn timestamp_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_constructed_values() {
        let entry = LogEntry::new(EntryId::new("1").unwrap(), "hello", 1_712_603_400_000);
        assert_eq!(entry.id().as_str(), "1");
        assert_eq!(entry.raw_text(), "hello");
        assert_eq!(entry.timestamp(), 1_712_603_400_000);
    }

    #[test]
    fn timestamp_utc_converts_epoch_millis() {
        let entry = LogEntry::new(EntryId::new("1").unwrap(), "x", 0);
        let dt = entry.timestamp_utc().unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn serializes_as_flat_json_object() {
        let entry = LogEntry::new(EntryId::new("42").unwrap(), "boom", 5);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"id":"42","raw_text":"boom","timestamp":5}"#);
    }
}
