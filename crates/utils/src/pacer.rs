//! Request pacer: minimum spacing between call starts, bounded concurrency.
//!
//! One pacer per upstream provider. Callers `schedule` closures; the pacer
//! admits them in arrival order, holds each until its start slot, and lets
//! at most `max_concurrent` run at once. A failing task simply releases its
//! slot, the next queued task proceeds.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use folio_common::error::{FolioError, FolioResult};

pub struct RequestPacer {
    min_spacing: Duration,
    permits: Semaphore,
    /// Earliest instant the next admitted task may start.
    next_start: Mutex<Option<Instant>>,
    closed: watch::Sender<bool>,
}

impl RequestPacer {
    pub fn new(max_concurrent: usize, min_spacing: Duration) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            min_spacing,
            permits: Semaphore::new(max_concurrent.max(1)),
            next_start: Mutex::new(None),
            closed,
        }
    }

    /// Single-queue pacer: one call in flight, `min_spacing` between starts.
    pub fn serial(min_spacing: Duration) -> Self {
        Self::new(1, min_spacing)
    }

    /// Run `task` once a concurrency slot and a start slot are both free.
    ///
    /// Fails with [`FolioError::PacerClosed`] if the pacer is closed before
    /// the task starts. A task that already started runs to completion.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> FolioResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // Semaphore waiters are served FIFO.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FolioError::PacerClosed)?;

        let start_at = self.reserve_slot();
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(FolioError::PacerClosed);
        }

        if start_at > Instant::now() {
            debug!(wait_ms = (start_at - Instant::now()).as_millis() as u64, "pacer delay");
            tokio::select! {
                _ = tokio::time::sleep_until(start_at) => {}
                // Only `close()` ever sends on this channel.
                _ = closed.changed() => return Err(FolioError::PacerClosed),
            }
        }

        Ok(task().await)
    }

    /// Tear down: wake every pending delay and reject queued tasks.
    pub fn close(&self) {
        self.closed.send_replace(true);
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn reserve_slot(&self) -> Instant {
        let mut next = self
            .next_start
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        let at = match *next {
            Some(t) if t > now => t,
            _ => now,
        };
        *next = Some(at + self.min_spacing);
        at
    }
}

impl Drop for RequestPacer {
    fn drop(&mut self) {
        self.close();
    }
}
