//! Cancelable render tasks
//!
//! A [`RenderTask`] is handed to the worker together with a render request.
//! The service keeps a clone and cancels it as soon as a newer render
//! supersedes it; the worker checks the flag between rasterization stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancelable handle for one in-progress page rasterization
#[derive(Clone, Debug, Default)]
pub struct RenderTask {
    cancelled: Arc<AtomicBool>,
}

impl RenderTask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the task. All clones observe the cancellation; calling it twice is harmless.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let task = RenderTask::new();
        let worker_side = task.clone();

        assert!(!worker_side.is_cancelled());
        task.cancel();
        assert!(worker_side.is_cancelled());

        task.cancel();
        assert!(task.is_cancelled());
    }

    #[test]
    fn cancellation_visible_across_threads() {
        let task = RenderTask::new();
        let worker_side = task.clone();

        let handle = std::thread::spawn(move || {
            while !worker_side.is_cancelled() {
                std::thread::yield_now();
            }
            true
        });

        task.cancel();
        assert!(handle.join().unwrap());
    }
}
