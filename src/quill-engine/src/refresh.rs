//! Document refresh trigger.
//!
//! On every `edit` event the authoritative document is re-fetched from
//! the store and the local copy replaced in full; the engine never
//! applies edit operations locally. Refreshes are not coalesced, but a
//! generation number keeps a slow fetch from clobbering a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use quill_protocol::Document;
use tokio::sync::{mpsc, watch};

use crate::documents::DocumentStore;
use crate::error::Result;

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient, dismissible notification for the host UI. Collaborator
/// faults surface here instead of corrupting engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

struct RefresherInner {
    store: Arc<dyn DocumentStore>,
    document_id: String,
    slot: watch::Sender<Option<Document>>,
    /// Monotonic fetch counter.
    generation: AtomicU64,
    /// Highest generation whose result has been applied.
    last_applied: Mutex<u64>,
    notices: mpsc::UnboundedSender<Notice>,
}

/// Re-fetches the authoritative document on edit events.
#[derive(Clone)]
pub struct DocumentRefresher {
    inner: Arc<RefresherInner>,
}

impl DocumentRefresher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        document_id: impl Into<String>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(RefresherInner {
                store,
                document_id: document_id.into(),
                slot,
                generation: AtomicU64::new(0),
                last_applied: Mutex::new(0),
                notices,
            }),
        }
    }

    /// Trigger an asynchronous re-fetch. Called once per `edit` event;
    /// bursts are not coalesced.
    pub fn on_edit(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.store.get(&inner.document_id).await {
                Ok(document) => apply_fetched(&inner, generation, document),
                Err(e) => {
                    tracing::warn!(document = %inner.document_id, error = %e, "document refresh failed");
                    let _ = inner
                        .notices
                        .send(Notice::error(format!("Failed to refresh document: {e}")));
                }
            }
        });
    }

    /// Fetch the document right now and seed the slot. Used for the
    /// initial load; failures propagate to the caller instead of the
    /// notice channel.
    pub async fn refresh_now(&self) -> Result<Document> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let document = self.inner.store.get(&self.inner.document_id).await?;
        apply_fetched(&self.inner, generation, document.clone());
        Ok(document)
    }

    /// The locally held copy, if any fetch has completed.
    pub fn current(&self) -> Option<Document> {
        self.inner.slot.borrow().clone()
    }

    /// Subscribe to document replacements.
    pub fn subscribe(&self) -> watch::Receiver<Option<Document>> {
        self.inner.slot.subscribe()
    }

    pub fn document_id(&self) -> &str {
        &self.inner.document_id
    }
}

fn apply_fetched(inner: &RefresherInner, generation: u64, document: Document) {
    let mut last = match inner.last_applied.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if generation <= *last {
        tracing::debug!(generation, applied = *last, "stale document refresh ignored");
        return;
    }
    *last = generation;
    inner.slot.send_replace(Some(document));
}
