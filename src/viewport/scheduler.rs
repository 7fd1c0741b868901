//! Debounce and coalescing of render triggers.

use std::time::{Duration, Instant};

/// Work that became due on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    /// Queued appends should be applied.
    pub append: bool,
    /// A debounced scroll render is due.
    pub scroll: bool,
}

impl Due {
    /// Whether anything is due.
    pub fn any(self) -> bool {
        self.append || self.scroll
    }
}

/// Tracks pending render triggers between ticks.
///
/// Scroll requests restart a debounce window; the render happens once the
/// window elapses with no further scrolling. Append requests are coalesced
/// and become due on the next tick.
#[derive(Debug, Clone)]
pub struct Scheduler {
    debounce: Duration,
    scroll_deadline: Option<Instant>,
    append_pending: bool,
}

impl Scheduler {
    /// Scheduler with the given scroll debounce window.
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            scroll_deadline: None,
            append_pending: false,
        }
    }

    /// Restart the scroll debounce window at `now`.
    pub fn request_scroll(&mut self, now: Instant) {
        self.scroll_deadline = Some(now + self.debounce);
    }

    /// Mark appends as pending.
    pub fn request_append(&mut self) {
        self.append_pending = true;
    }

    /// Forget a pending scroll render.
    pub fn cancel_scroll(&mut self) {
        self.scroll_deadline = None;
    }

    /// Forget everything pending.
    pub fn reset(&mut self) {
        self.scroll_deadline = None;
        self.append_pending = false;
    }

    /// Take whatever is due at `now`, leaving the rest pending.
    pub fn take_due(&mut self, now: Instant) -> Due {
        let scroll = self.scroll_deadline.is_some_and(|deadline| deadline <= now);
        if scroll {
            self.scroll_deadline = None;
        }
        Due {
            append: std::mem::take(&mut self.append_pending),
            scroll,
        }
    }

    /// Take everything regardless of deadlines.
    pub fn take_all(&mut self) -> Due {
        Due {
            append: std::mem::take(&mut self.append_pending),
            scroll: self.scroll_deadline.take().is_some(),
        }
    }

    /// Earliest instant something becomes due, if anything is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.append_pending {
            return Some(now);
        }
        self.scroll_deadline
    }
}
