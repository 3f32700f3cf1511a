//! Highlighted-line state.
//!
//! Tracks the single "currently being edited" line pointer. Writes are
//! last-write-wins; the pointer is observable through a watch channel so
//! a host UI can subscribe to changes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct Inner {
    line: watch::Sender<Option<u32>>,
    /// Token for the pending delayed clear, if one is scheduled.
    pending_clear: Mutex<Option<CancellationToken>>,
}

/// Shared highlight pointer with a timed auto-clear.
#[derive(Clone)]
pub struct HighlightState {
    inner: Arc<Inner>,
}

impl HighlightState {
    pub fn new() -> Self {
        let (line, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                line,
                pending_clear: Mutex::new(None),
            }),
        }
    }

    /// Point at a line immediately. Supersedes any pending delayed clear.
    pub fn set(&self, line: u32) {
        self.cancel_pending();
        self.inner.line.send_replace(Some(line));
    }

    /// Clear the pointer immediately (failure and cancellation paths).
    pub fn clear_now(&self) {
        self.cancel_pending();
        self.inner.line.send_replace(None);
    }

    /// Schedule a clear after `delay` (success path), so the last-edited
    /// line stays visible briefly. A newer `set`, `clear_now`, or
    /// `clear_after` supersedes the pending clear.
    pub fn clear_after(&self, delay: Duration) {
        self.cancel_pending();

        let token = CancellationToken::new();
        if let Ok(mut pending) = self.inner.pending_clear.lock() {
            *pending = Some(token.clone());
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    inner.line.send_replace(None);
                    if let Ok(mut pending) = inner.pending_clear.lock() {
                        *pending = None;
                    }
                }
            }
        });
    }

    /// Drop a pending delayed clear without touching the pointer. A new
    /// session owns the highlight from now on and schedules its own clear.
    pub fn cancel_pending_clear(&self) {
        self.cancel_pending();
    }

    /// The current pointer value.
    pub fn current(&self) -> Option<u32> {
        *self.inner.line.borrow()
    }

    /// Subscribe to pointer changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<u32>> {
        self.inner.line.subscribe()
    }

    fn cancel_pending(&self) {
        if let Ok(mut pending) = self.inner.pending_clear.lock() {
            if let Some(token) = pending.take() {
                token.cancel();
            }
        }
    }
}

impl Default for HighlightState {
    fn default() -> Self {
        Self::new()
    }
}
