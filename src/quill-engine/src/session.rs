//! Streaming edit session transport.
//!
//! Opens one request to the edit endpoint per prompt submission and
//! forwards decoded events over a channel, in wire order. Transport
//! failure yields exactly one `Err` item; normal end-of-data simply
//! closes the stream, which is deliberately distinct from a session
//! reporting `error`.

use futures::StreamExt;
use quill_protocol::{ChatRequest, SessionId, StreamEvent};
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::api_client::{create_streaming_client, extract_error_message};
use crate::config::EngineConfig;
use crate::error::{QuillError, Result};
use crate::sse::{SseDecoder, decode_event};

/// Ordered stream of decoded events for one session.
pub type EventStream = ReceiverStream<Result<StreamEvent>>;

/// Handle to a running edit session.
///
/// Cancellation is cooperative: the transport keeps draining, but no
/// further events are forwarded once the token fires.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Suppress all further observable events from this session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Client for the streaming edit endpoint.
pub struct StreamClient {
    client: Client,
    config: EngineConfig,
}

impl StreamClient {
    /// Create a client with a streaming-profile HTTP client.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            client: create_streaming_client()?,
            config,
        })
    }

    /// Open one streaming edit exchange for a document.
    ///
    /// A non-success response status is surfaced as an error with no
    /// events delivered. On success, a background task drives the SSE
    /// decoder and forwards every decoded event until the transport ends.
    pub async fn stream_edit(
        &self,
        session_id: SessionId,
        document_id: &str,
        prompt: &str,
    ) -> Result<(SessionHandle, EventStream)> {
        let url = self
            .config
            .endpoint(&format!("/api/chat/stream/{document_id}"));
        tracing::debug!(url = %url, "opening edit stream");

        let resp = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&ChatRequest::new(prompt))
            .send()
            .await
            .map_err(|e| QuillError::ConnectionFailed {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(QuillError::NotFound(format!(
                "Document not found: {document_id}"
            )));
        }
        if !resp.status().is_success() {
            let message = extract_error_message(resp).await;
            tracing::error!(url = %url, message = %message, "edit stream request failed");
            return Err(QuillError::Backend { message });
        }

        let (tx, rx) = mpsc::channel::<Result<StreamEvent>>(100);
        let cancel = CancellationToken::new();
        let handle = SessionHandle {
            session_id,
            cancel: cancel.clone(),
        };
        let chunk_timeout = self.config.chunk_timeout;

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut stream = resp.bytes_stream();

            'transport: loop {
                // Per-chunk stall deadline so a hung connection fails the
                // session instead of blocking indefinitely.
                let chunk = match timeout(chunk_timeout, stream.next()).await {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(e))) => {
                        if !cancel.is_cancelled() {
                            let _ = tx
                                .send(Err(QuillError::Backend {
                                    message: format!("Stream error: {e}"),
                                }))
                                .await;
                        }
                        break;
                    }
                    Ok(None) => break, // transport ended normally
                    Err(_) => {
                        if !cancel.is_cancelled() {
                            let _ = tx
                                .send(Err(QuillError::Backend {
                                    message: format!(
                                        "Stream stalled - no data received for {} seconds",
                                        chunk_timeout.as_secs()
                                    ),
                                }))
                                .await;
                        }
                        break;
                    }
                };

                for payload in decoder.feed(&chunk) {
                    if cancel.is_cancelled() {
                        // Keep draining the transport so the response body
                        // is not abandoned mid-read; swallow the event.
                        tracing::debug!(session = %session_id, "swallowing event after cancellation");
                        continue;
                    }
                    let Some(event) = decode_event(&payload) else {
                        continue;
                    };
                    if tx.send(Ok(event)).await.is_err() {
                        // Receiver dropped; nothing left to deliver to.
                        break 'transport;
                    }
                }
            }

            decoder.finish();
            tracing::debug!(session = %session_id, "edit stream closed");
        });

        Ok((handle, ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_cancellation_flag() {
        let handle = SessionHandle {
            session_id: SessionId::new(),
            cancel: CancellationToken::new(),
        };
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());

        // Clones observe the same token.
        let clone = handle.clone();
        assert!(clone.is_cancelled());
    }
}
