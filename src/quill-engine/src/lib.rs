//! Quill Engine - client core for AI-assisted document editing
//!
//! One prompt submission opens one streaming edit exchange. The engine
//! decodes the SSE event stream incrementally, applies token/thinking
//! events to the chat transcript, tracks the highlighted line, and
//! re-fetches the authoritative document whenever the agent reports an
//! edit. The document persistence backend and the agent itself are
//! external collaborators reached over HTTP.

pub mod api_client;
pub mod config;
pub mod controller;
pub mod documents;
pub mod error;
pub mod highlight;
pub mod refresh;
pub mod session;
pub mod sse;
pub mod transcript;

// Re-exports
pub use config::EngineConfig;
pub use controller::{ChatController, SessionOutcome, SessionTicket};
pub use documents::{DocumentStore, HttpDocumentStore};
pub use error::{QuillError, Result};
pub use highlight::HighlightState;
pub use refresh::{DocumentRefresher, Notice, NoticeLevel};
pub use session::{EventStream, SessionHandle, StreamClient};
pub use sse::{SseDecoder, decode_event};
pub use transcript::Transcript;
