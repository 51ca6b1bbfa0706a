//! Per-minute budget for contract metadata lookups.
//!
//! One instance is shared by every network enriched during a load (and, in
//! the CLI, across loads). It is the only thing keeping the combined fan-out
//! under the pricing provider's free-tier ceiling.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Length of one budget window.
pub const BUDGET_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Window {
    start: Option<Instant>,
    used: u32,
}

/// Fixed window that resets once it has expired (not a sliding window).
#[derive(Debug)]
pub struct RateBudget {
    per_minute: u32,
    window: Mutex<Window>,
}

impl RateBudget {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            window: Mutex::new(Window::default()),
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Take one unit from the current window. Returns `false`, leaving the
    /// window untouched, when it is already spent.
    pub fn try_consume_one(&self) -> bool {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let expired = window
            .start
            .map_or(true, |start| now.duration_since(start) >= BUDGET_WINDOW);
        if expired {
            window.start = Some(now);
            window.used = 0;
        }

        if window.used < self.per_minute {
            window.used += 1;
            true
        } else {
            debug!(budget = self.per_minute, "metadata budget exhausted for this window");
            false
        }
    }

    /// Units left in the current window, as of now.
    pub fn remaining(&self) -> u32 {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        match window.start {
            Some(start) if start.elapsed() < BUDGET_WINDOW => {
                self.per_minute.saturating_sub(window.used)
            }
            _ => self.per_minute,
        }
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(folio_common::constants::DEFAULT_METADATA_BUDGET_PER_MINUTE)
    }
}
