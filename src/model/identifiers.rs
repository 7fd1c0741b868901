//! Identifier newtypes with smart constructors.
//!
//! Entry ids are assigned by the ingestion side and are opaque to the core,
//! except that they must be non-empty and unique within one store.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier of a log entry.
///
/// Ids are strictly increasing in arrival order. The core never compares
/// them for ordering; it only relies on uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

/// Error returned when constructing an [`EntryId`] from an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entry id must not be empty")]
pub struct InvalidEntryId;

impl EntryId {
    /// Smart constructor: validates the id is non-empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidEntryId> {
        let raw = raw.into();
        if raw.is_empty() {
            Err(InvalidEntryId)
        } else {
            Ok(Self(raw))
        }
    }

    /// Build an id from a sequence number.
    ///
    /// Zero-padded so that lexicographic order matches numeric order.
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("{seq:012}"))
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntryId {
    type Error = InvalidEntryId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}
