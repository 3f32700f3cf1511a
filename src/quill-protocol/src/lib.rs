//! Quill Protocol - Types shared between the editing engine and its hosts
//!
//! This crate defines the streaming event wire format consumed from the
//! document-edit endpoint, the document models served by the document
//! store, and the chat transcript entry types the engine maintains.

pub mod chat;
pub mod document;
pub mod events;
pub mod session_id;

// Re-exports
pub use chat::{ChatMessage, ChatRequest, Role};
pub use document::{
    Document, DocumentCreate, DocumentEdit, DocumentLine, DocumentUpdate, EditOperation,
};
pub use events::StreamEvent;
pub use session_id::SessionId;
