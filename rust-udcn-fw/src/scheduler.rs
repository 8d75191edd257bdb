//! A cooperative, single-threaded event scheduler.
//!
//! NFD's forwarding pipeline runs on a single `boost::asio::io_service`
//! thread; timers are scheduled with `scheduler::schedule` and canceled by
//! dropping the returned `EventId`. This module reproduces that model on top
//! of `tokio::task::LocalSet`: `spawn_local` lets PIT/Measurements entries be
//! held as `Rc<RefCell<_>>` without `Send` bounds, and `ScopedEventId`'s
//! `Drop` aborts the underlying task the way NFD's `EventId` destructor
//! cancels its timer.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A scheduled callback's handle. Dropping it cancels the callback if it has
/// not yet fired, matching NFD's scoped `EventId` / `ScopedEventId`.
#[must_use = "dropping a ScopedEventId cancels the scheduled event"]
pub struct ScopedEventId {
    handle: JoinHandle<()>,
}

impl ScopedEventId {
    /// Detach this handle: the callback runs to completion even after this
    /// `ScopedEventId` is dropped. Used when a caller explicitly wants a
    /// fire-and-forget timer (rare; most strategy timers are scoped).
    pub fn detach(self) {
        std::mem::forget(self);
    }

    /// Cancel the scheduled event immediately.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for ScopedEventId {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Schedules callbacks onto the current `LocalSet`. Must be used from
/// within a `LocalSet::run_until` context (or an equivalent task spawned via
/// `spawn_local`), as callbacks may close over `Rc`/`RefCell` state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// Runs `callback` after `after` elapses, on the local task set.
    pub fn schedule<F>(&self, after: Duration, callback: F) -> ScopedEventId
    where
        F: Future<Output = ()> + 'static,
    {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(after).await;
            callback.await;
        });
        ScopedEventId { handle }
    }

    /// Convenience wrapper for a synchronous `FnOnce` callback.
    pub fn schedule_fn<F>(&self, after: Duration, callback: F) -> ScopedEventId
    where
        F: FnOnce() + 'static,
    {
        self.schedule(after, async move { callback() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn schedule_fn_fires_after_duration() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let fired = Rc::new(RefCell::new(false));
                let fired2 = fired.clone();
                let scheduler = Scheduler::new();
                let _event = scheduler.schedule_fn(Duration::from_millis(50), move || {
                    *fired2.borrow_mut() = true;
                });

                tokio::time::advance(Duration::from_millis(60)).await;
                tokio::task::yield_now().await;
                assert!(*fired.borrow());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scoped_event_id_cancels_it() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let fired = Rc::new(RefCell::new(false));
                let fired2 = fired.clone();
                let scheduler = Scheduler::new();
                {
                    let _event = scheduler.schedule_fn(Duration::from_millis(50), move || {
                        *fired2.borrow_mut() = true;
                    });
                    // _event dropped here, canceling the timer.
                }

                tokio::time::advance(Duration::from_millis(60)).await;
                tokio::task::yield_now().await;
                assert!(!*fired.borrow());
            })
            .await;
    }
}
