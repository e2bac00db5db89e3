//! Process-lifetime state shared by every engine instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// State that outlives a single mounted engine.
///
/// Hosts create one per process and hand it to each engine they mount.
#[derive(Debug, Default)]
pub struct SharedState {
    offscreen_failed: AtomicBool,
    slideshow_queue: Mutex<VecDeque<String>>,
}

impl SharedState {
    /// Creates fresh state.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Whether off-thread rendering has failed before. Never resets.
    #[must_use]
    pub fn offscreen_failed(&self) -> bool { self.offscreen_failed.load(Ordering::Acquire) }

    /// Records an off-thread rendering failure. Returns `true` only for the
    /// call that flipped the flag.
    pub fn mark_offscreen_failed(&self) -> bool {
        !self.offscreen_failed.swap(true, Ordering::AcqRel)
    }

    /// Runs `f` with the slideshow rotation queue locked.
    pub fn with_slideshow_queue<R>(&self, f: impl FnOnce(&mut VecDeque<String>) -> R) -> R {
        f(&mut self.slideshow_queue.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offscreen_flag_is_sticky() {
        let shared = SharedState::new();
        assert!(!shared.offscreen_failed());
        assert!(shared.mark_offscreen_failed());
        assert!(!shared.mark_offscreen_failed());
        assert!(shared.offscreen_failed());
    }

    #[test]
    fn test_queue_is_shared_across_calls() {
        let shared = SharedState::new();
        shared.with_slideshow_queue(|queue| queue.push_back("/a.png".to_string()));
        let popped = shared.with_slideshow_queue(VecDeque::pop_front);
        assert_eq!(popped.as_deref(), Some("/a.png"));
    }
}
