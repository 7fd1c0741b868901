//! Domain model types (pure).
//!
//! All types in this module are plain data with smart constructors. They carry
//! no references to the store, the viewport or the rendering surface.

pub mod error;
pub mod highlighted;
pub mod identifiers;
pub mod log_entry;
pub mod span;

pub use error::{AppError, InputError, StoreError};
pub use highlighted::{HighlightedEntry, TagPair};
pub use identifiers::{EntryId, InvalidEntryId};
pub use log_entry::LogEntry;
pub use span::{class, StyledSpan, TokenSpan};
