//! Ready-made [`Cancellation`] sources.

use crate::traits::Cancellation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Never asks to stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Cancellation for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared flag, set from another thread or a UI callback.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Cancellation for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Stops when `inner` does or when the time limit runs out.
pub struct Deadline<'a, C: Cancellation + ?Sized> {
    inner: &'a C,
    start: Instant,
    limit: Option<Duration>,
}

impl<'a, C: Cancellation + ?Sized> Deadline<'a, C> {
    pub fn new(inner: &'a C, limit: Option<Duration>) -> Self {
        Self {
            inner,
            start: Instant::now(),
            limit,
        }
    }

    pub fn expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<C: Cancellation + ?Sized> Cancellation for Deadline<'_, C> {
    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled() || self.expired()
    }
}
