//! Virtualized viewport: visible-range computation, handle recycling,
//! height measurement and scroll anchoring.
//!
//! - `engine`: ViewportEngine - owns the store, geometry and bound handles
//! - `provider`: RenderProvider - seam to whatever draws rows
//! - `scheduler`: Scheduler - scroll debounce and append coalescing

pub mod engine;
pub mod provider;
pub mod scheduler;

pub use engine::{Geometry, ViewportEngine, ViewportError, ViewportOptions};
pub use provider::RenderProvider;
pub use scheduler::{Due, Scheduler};
