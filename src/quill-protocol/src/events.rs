//! Streaming event wire format.
//!
//! One edit session streams a sequence of these records over SSE. The
//! `type` field discriminates; unrecognized types decode to [`StreamEvent::Unknown`]
//! so new server-side event kinds never break an older client.

use serde::{Deserialize, Serialize};

use crate::document::DocumentEdit;

/// One decoded record from the edit event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental response text to append.
    Token { content: String },

    /// Transient status text. Replaces the displayed assistant content
    /// until the next token arrives; never enters the accumulator.
    Thinking { content: String },

    /// Advisory 1-based line number currently being edited.
    Highlight { line: u32 },

    /// The persisted document changed; carries the applied operation.
    Edit { operation: DocumentEdit },

    /// Terminal success.
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    /// Terminal failure.
    Error { message: String },

    /// Unrecognized event kind, ignored by consumers.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
