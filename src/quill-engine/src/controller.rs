//! Chat controller.
//!
//! Owns one document-editing context: the transcript, the highlight
//! pointer, the authoritative document slot, and the single-active-session
//! guard. Each submission runs on its own task, which is the only place
//! that mutates this context's state while the session is live.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use quill_protocol::{ChatMessage, Document, SessionId, StreamEvent};
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::documents::DocumentStore;
use crate::error::{QuillError, Result};
use crate::highlight::HighlightState;
use crate::refresh::{DocumentRefresher, Notice};
use crate::session::{EventStream, SessionHandle, StreamClient};
use crate::transcript::Transcript;

/// How one edit session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Terminal `done`, or clean end of transport without a terminal
    /// record (the transport finished; the session did not fail).
    Completed,
    /// Session-reported `error` or a transport fault.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

/// A running session: await the outcome, or cancel it.
#[derive(Debug)]
pub struct SessionTicket {
    session_id: SessionId,
    handle: SessionHandle,
    join: JoinHandle<SessionOutcome>,
}

impl SessionTicket {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Cooperatively cancel the session. Further events are swallowed.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for the session to finish.
    pub async fn wait(self) -> SessionOutcome {
        self.join.await.unwrap_or(SessionOutcome::Failed)
    }
}

/// Releases the single-active-session guard when the session ends,
/// whichever way it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One document-editing context.
pub struct ChatController {
    stream: StreamClient,
    document_id: String,
    clear_delay: Duration,
    transcript: Arc<RwLock<Transcript>>,
    highlight: HighlightState,
    refresher: DocumentRefresher,
    busy: Arc<AtomicBool>,
    active: Arc<Mutex<Option<SessionHandle>>>,
    notices: Mutex<mpsc::UnboundedReceiver<Notice>>,
}

impl ChatController {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn DocumentStore>,
        document_id: impl Into<String>,
    ) -> Result<Self> {
        let document_id = document_id.into();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let refresher = DocumentRefresher::new(store, document_id.clone(), notices_tx);
        Ok(Self {
            stream: StreamClient::new(config.clone())?,
            clear_delay: config.highlight_clear_delay,
            document_id,
            transcript: Arc::new(RwLock::new(Transcript::new())),
            highlight: HighlightState::new(),
            refresher,
            busy: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
            notices: Mutex::new(notices_rx),
        })
    }

    /// Submit a prompt for this document.
    ///
    /// Rejected without side effects while another session is in flight.
    /// A failure to open the exchange is surfaced on the in-flight
    /// assistant entry and returned; in-stream outcomes resolve through
    /// the returned [`SessionTicket`].
    pub async fn submit(&self, prompt: impl Into<String>) -> Result<SessionTicket> {
        let prompt = prompt.into();
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("submission rejected: session already in flight");
            return Err(QuillError::SessionActive);
        }
        let busy = BusyGuard(Arc::clone(&self.busy));

        // The new session owns the highlight from here; a clear still
        // pending from the previous session must not fire into it.
        self.highlight.cancel_pending_clear();

        let session_id = SessionId::new();
        {
            let mut transcript = self.transcript.write().await;
            transcript.push_user(prompt.clone());
            transcript.begin_assistant(session_id);
        }

        match self
            .stream
            .stream_edit(session_id, &self.document_id, &prompt)
            .await
        {
            Ok((handle, events)) => {
                if let Ok(mut active) = self.active.lock() {
                    *active = Some(handle.clone());
                }
                let ctx = SessionContext {
                    transcript: Arc::clone(&self.transcript),
                    highlight: self.highlight.clone(),
                    refresher: self.refresher.clone(),
                    active: Arc::clone(&self.active),
                    clear_delay: self.clear_delay,
                };
                let join = tokio::spawn(run_session(
                    ctx,
                    session_id,
                    handle.clone(),
                    events,
                    busy,
                ));
                Ok(SessionTicket {
                    session_id,
                    handle,
                    join,
                })
            }
            Err(e) => {
                // No events were delivered; show the failure on the
                // assistant entry created for this session.
                self.transcript.write().await.apply(
                    session_id,
                    &StreamEvent::Error {
                        message: e.to_string(),
                    },
                );
                self.highlight.clear_now();
                Err(e)
            }
        }
    }

    /// Cancel the in-flight session, if any.
    pub fn cancel_active(&self) {
        if let Ok(active) = self.active.lock() {
            if let Some(handle) = active.as_ref() {
                handle.cancel();
            }
        }
    }

    /// Whether a session is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Snapshot of the transcript, in order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.read().await.messages().to_vec()
    }

    /// The highlight pointer.
    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    /// The locally held authoritative document, if loaded.
    pub fn document(&self) -> Option<Document> {
        self.refresher.current()
    }

    /// Subscribe to document replacements.
    pub fn subscribe_document(&self) -> watch::Receiver<Option<Document>> {
        self.refresher.subscribe()
    }

    /// Fetch the document now and seed the local copy.
    pub async fn load_document(&self) -> Result<Document> {
        self.refresher.refresh_now().await
    }

    /// Take the next pending transient notification, if any.
    pub fn poll_notice(&self) -> Option<Notice> {
        self.notices.lock().ok()?.try_recv().ok()
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

/// Everything the session task needs from the controller.
struct SessionContext {
    transcript: Arc<RwLock<Transcript>>,
    highlight: HighlightState,
    refresher: DocumentRefresher,
    active: Arc<Mutex<Option<SessionHandle>>>,
    clear_delay: Duration,
}

/// Pump one session's event stream to completion, routing each event.
async fn run_session(
    ctx: SessionContext,
    session_id: SessionId,
    handle: SessionHandle,
    mut events: EventStream,
    busy: BusyGuard,
) -> SessionOutcome {
    let mut outcome: Option<SessionOutcome> = None;

    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                ctx.transcript.write().await.apply(session_id, &event);
                match &event {
                    StreamEvent::Highlight { line } => ctx.highlight.set(*line),
                    StreamEvent::Edit { operation } => {
                        tracing::debug!(
                            operation = %operation.operation,
                            line_start = operation.line_start,
                            "document edited upstream, refreshing"
                        );
                        ctx.refresher.on_edit();
                    }
                    StreamEvent::Done { .. } if outcome.is_none() => {
                        ctx.highlight.clear_after(ctx.clear_delay);
                        outcome = Some(SessionOutcome::Completed);
                    }
                    StreamEvent::Error { message } if outcome.is_none() => {
                        tracing::warn!(session = %session_id, message = %message, "session failed");
                        ctx.highlight.clear_now();
                        outcome = Some(SessionOutcome::Failed);
                    }
                    _ => {}
                }
            }
            Err(e) => {
                if outcome.is_none() {
                    tracing::warn!(session = %session_id, error = %e, "transport fault");
                    ctx.transcript.write().await.apply(
                        session_id,
                        &StreamEvent::Error {
                            message: e.to_string(),
                        },
                    );
                    ctx.highlight.clear_now();
                    outcome = Some(SessionOutcome::Failed);
                }
                break;
            }
        }
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None if handle.is_cancelled() => {
            ctx.transcript.write().await.seal_with_accumulator(session_id);
            ctx.highlight.clear_now();
            SessionOutcome::Cancelled
        }
        None => {
            // Transport ended without a terminal record: the exchange is
            // over, seal with whatever accumulated.
            ctx.transcript.write().await.seal_with_accumulator(session_id);
            ctx.highlight.clear_after(ctx.clear_delay);
            SessionOutcome::Completed
        }
    };

    if let Ok(mut active) = ctx.active.lock() {
        *active = None;
    }
    drop(busy);
    tracing::debug!(session = %session_id, ?outcome, "session finished");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = Arc::new(AtomicBool::new(true));
        let guard = BusyGuard(Arc::clone(&flag));
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_session_outcome_equality() {
        assert_eq!(SessionOutcome::Completed, SessionOutcome::Completed);
        assert_ne!(SessionOutcome::Completed, SessionOutcome::Cancelled);
    }
}
