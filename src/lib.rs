//! Log Viewer (logview)
//!
//! Interactive terminal viewer for append-only log streams.
//!
//! Lines are tokenized into classified spans (tags, dates, numbers, URLs,
//! in-band ANSI styling), filtered by substring and tag queries, and shown
//! through a virtualized viewport that binds only the rows near the visible
//! window.
//!
//! # Module Structure
//!
//! - [`model`] - entries, token spans, error taxonomy
//! - [`tokenizer`] - line text to span list
//! - [`filter`] - query parsing and matching
//! - [`store`] - append-only log with highlight cache and filtered view
//! - [`view_state`] - height cache, visible range, scroll anchoring
//! - [`viewport`] - virtualized render engine over a render-node provider
//! - [`worker`] - background tokenization pool
//! - [`source`] - stdin/file line ingestion
//! - [`view`] - terminal provider and event loop
//! - [`config`], [`logging`] - ambient setup

pub mod config;
pub mod filter;
pub mod logging;
pub mod model;
pub mod source;
pub mod store;
pub mod tokenizer;
pub mod view;
pub mod view_state;
pub mod viewport;
pub mod worker;
