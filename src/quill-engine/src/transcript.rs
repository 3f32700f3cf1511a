//! Chat transcript state.
//!
//! An ordered message list plus the per-session accumulator that turns
//! stream events into in-place mutations of the session's assistant
//! message. All rules here are pure state transitions: no IO, no timers.

use std::collections::HashMap;

use quill_protocol::{ChatMessage, SessionId, StreamEvent};
use uuid::Uuid;

/// Per-session streaming state.
#[derive(Debug)]
struct SessionSlot {
    /// The one assistant message this session mutates.
    message_id: Uuid,
    /// Append-only accumulated response text. Thinking overlays never
    /// enter the accumulator.
    accumulator: String,
    /// Set by the terminal event; once set, nothing mutates the message.
    sealed: bool,
}

/// The chat transcript and its reducer.
///
/// Messages are never reordered or deleted by event handling. Events for
/// unknown or sealed sessions are ignored.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    sessions: HashMap<SessionId, SessionSlot>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an immutable user message. Returns its id.
    pub fn push_user(&mut self, content: impl Into<String>) -> Uuid {
        let message = ChatMessage::user(content);
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Append the empty streaming assistant message for a session.
    /// Returns its id. All of the session's events target this message.
    pub fn begin_assistant(&mut self, session_id: SessionId) -> Uuid {
        let message = ChatMessage::assistant_streaming();
        let id = message.id;
        self.messages.push(message);
        self.sessions.insert(
            session_id,
            SessionSlot {
                message_id: id,
                accumulator: String::new(),
                sealed: false,
            },
        );
        id
    }

    /// Apply one stream event to the session's assistant message.
    pub fn apply(&mut self, session_id: SessionId, event: &StreamEvent) {
        let Some(slot) = self.sessions.get_mut(&session_id) else {
            tracing::debug!(session = %session_id, "event for unknown session ignored");
            return;
        };
        if slot.sealed {
            tracing::debug!(session = %session_id, "event after terminal ignored");
            return;
        }
        let message_id = slot.message_id;

        match event {
            StreamEvent::Token { content } => {
                slot.accumulator.push_str(content);
                let content = slot.accumulator.clone();
                self.set_content(message_id, content);
            }
            StreamEvent::Thinking { content } => {
                // Display override only; superseded by the next token.
                self.set_content(message_id, format!("_{content}_"));
            }
            StreamEvent::Done { summary } => {
                let content = match summary {
                    Some(summary) if slot.accumulator.is_empty() => format!("✅ {summary}"),
                    Some(summary) => format!("{}\n\n✅ {summary}", slot.accumulator),
                    None => slot.accumulator.clone(),
                };
                slot.sealed = true;
                self.set_content(message_id, content);
                self.seal_message(message_id);
            }
            StreamEvent::Error { message } => {
                slot.sealed = true;
                self.set_content(message_id, format!("❌ {message}"));
                self.seal_message(message_id);
            }
            // Routed to the highlight controller / refresh trigger by the
            // chat controller; no transcript mutation.
            StreamEvent::Highlight { .. } | StreamEvent::Edit { .. } => {}
            StreamEvent::Unknown => {
                tracing::debug!(session = %session_id, "unknown event kind ignored");
            }
        }
    }

    /// Seal a session's message with whatever accumulated, dropping any
    /// thinking overlay. Used when the transport ends without a terminal
    /// record, and on cancellation.
    pub fn seal_with_accumulator(&mut self, session_id: SessionId) {
        let Some(slot) = self.sessions.get_mut(&session_id) else {
            return;
        };
        if slot.sealed {
            return;
        }
        slot.sealed = true;
        let message_id = slot.message_id;
        let content = slot.accumulator.clone();
        self.set_content(message_id, content);
        self.seal_message(message_id);
    }

    /// Whether a session has observed its terminal event.
    pub fn is_sealed(&self, session_id: SessionId) -> bool {
        self.sessions
            .get(&session_id)
            .map(|slot| slot.sealed)
            .unwrap_or(false)
    }

    /// The assistant message id owned by a session.
    pub fn assistant_message_id(&self, session_id: SessionId) -> Option<Uuid> {
        self.sessions.get(&session_id).map(|slot| slot.message_id)
    }

    /// All messages, in insertion order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Look up one message by id.
    pub fn message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn set_content(&mut self, message_id: Uuid, content: String) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.content = content;
        }
    }

    fn seal_message(&mut self, message_id: Uuid) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.seal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(content: &str) -> StreamEvent {
        StreamEvent::Token {
            content: content.to_string(),
        }
    }

    fn setup() -> (Transcript, SessionId, Uuid) {
        let mut transcript = Transcript::new();
        transcript.push_user("Add a paragraph about AI after line 5");
        let session_id = SessionId::new();
        let message_id = transcript.begin_assistant(session_id);
        (transcript, session_id, message_id)
    }

    #[test]
    fn test_tokens_append_in_order() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("A"));
        transcript.apply(session, &token("B"));
        transcript.apply(session, &token("C"));
        assert_eq!(transcript.message(message_id).unwrap().content, "ABC");
        assert!(transcript.message(message_id).unwrap().is_streaming);
    }

    #[test]
    fn test_thinking_overrides_without_entering_accumulator() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("A"));
        transcript.apply(
            session,
            &StreamEvent::Thinking {
                content: "Generating content...".to_string(),
            },
        );
        assert_eq!(
            transcript.message(message_id).unwrap().content,
            "_Generating content..._"
        );

        // The next token restores append-based content.
        transcript.apply(session, &token("B"));
        assert_eq!(transcript.message(message_id).unwrap().content, "AB");
    }

    #[test]
    fn test_done_appends_summary_suffix_and_seals() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("New paragraph."));
        transcript.apply(
            session,
            &StreamEvent::Done {
                summary: Some("Inserted content at line 5".to_string()),
            },
        );
        let message = transcript.message(message_id).unwrap();
        assert_eq!(
            message.content,
            "New paragraph.\n\n✅ Inserted content at line 5"
        );
        assert!(!message.is_streaming);
        assert!(transcript.is_sealed(session));
    }

    #[test]
    fn test_done_without_summary_keeps_accumulator() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("Text"));
        transcript.apply(session, &StreamEvent::Done { summary: None });
        assert_eq!(transcript.message(message_id).unwrap().content, "Text");
    }

    #[test]
    fn test_error_replaces_content_and_seals() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("partial"));
        transcript.apply(
            session,
            &StreamEvent::Error {
                message: "Could not understand the request".to_string(),
            },
        );
        let message = transcript.message(message_id).unwrap();
        assert_eq!(message.content, "❌ Could not understand the request");
        assert!(!message.is_streaming);
    }

    #[test]
    fn test_terminal_is_exclusive() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("A"));
        transcript.apply(session, &StreamEvent::Done { summary: None });

        // Late frames for a finished session never mutate the message.
        transcript.apply(session, &token("B"));
        transcript.apply(
            session,
            &StreamEvent::Error {
                message: "late".to_string(),
            },
        );
        assert_eq!(transcript.message(message_id).unwrap().content, "A");
    }

    #[test]
    fn test_highlight_edit_unknown_do_not_touch_transcript() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("A"));
        transcript.apply(session, &StreamEvent::Highlight { line: 7 });
        transcript.apply(session, &StreamEvent::Unknown);
        assert_eq!(transcript.message(message_id).unwrap().content, "A");
    }

    #[test]
    fn test_events_only_touch_own_session_message() {
        let (mut transcript, session, _) = setup();
        let user_content: Vec<String> = transcript
            .messages()
            .iter()
            .filter(|m| !m.is_streaming)
            .map(|m| m.content.clone())
            .collect();

        transcript.apply(session, &token("reply"));

        let user_after: Vec<String> = transcript
            .messages()
            .iter()
            .filter(|m| m.content != "reply")
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(user_content, user_after);
    }

    #[test]
    fn test_unknown_session_ignored() {
        let (mut transcript, _, message_id) = setup();
        transcript.apply(SessionId::new(), &token("stray"));
        assert_eq!(transcript.message(message_id).unwrap().content, "");
    }

    #[test]
    fn test_seal_with_accumulator_drops_thinking_overlay() {
        let (mut transcript, session, message_id) = setup();
        transcript.apply(session, &token("AB"));
        transcript.apply(
            session,
            &StreamEvent::Thinking {
                content: "working".to_string(),
            },
        );
        transcript.seal_with_accumulator(session);

        let message = transcript.message(message_id).unwrap();
        assert_eq!(message.content, "AB");
        assert!(!message.is_streaming);

        // Sealing is final here too.
        transcript.apply(session, &token("C"));
        assert_eq!(transcript.message(message_id).unwrap().content, "AB");
    }

    #[test]
    fn test_messages_never_reordered() {
        let (mut transcript, session, _) = setup();
        transcript.apply(session, &token("A"));
        transcript.apply(session, &StreamEvent::Done { summary: None });
        transcript.push_user("Another prompt");

        let roles: Vec<_> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                quill_protocol::Role::User,
                quill_protocol::Role::Assistant,
                quill_protocol::Role::User
            ]
        );
    }
}
