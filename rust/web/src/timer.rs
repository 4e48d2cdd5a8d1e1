//! One-shot cancellable timers.
//!
//! A [`Timer`] runs its callback on the tokio runtime after a delay. Each
//! timer carries the generation it was armed with; callbacks compare that
//! number against the owner's current state so a timer that fires after
//! being superseded does nothing.

use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug)]
pub struct Timer {
    generation: u64,
    handle: AbortHandle,
}

impl Timer {
    pub fn spawn<F>(generation: u64, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self {
            generation,
            handle: task.abort_handle(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the timer if it has not fired yet. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = Timer::spawn(7, Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timer.generation(), 7);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = Timer::spawn(1, Duration::from_millis(30), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
