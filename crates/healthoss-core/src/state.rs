//! UI-agnostic session state types
//!
//! These are the read-only shapes a front end sees. Only the session
//! controller can grow a [`Transcript`] or change a [`SessionState`].

use serde::{Deserialize, Serialize};

/// Greeting the assistant opens every session with.
pub const SEED_GREETING: &str = "Hello! I am your Health Assistant. How can I help you today?";

/// Assistant text shown in place of a reply when the backend can't be reached.
pub const DISPATCH_FAILURE_TEXT: &str = "Error: Could not connect to backend.";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Append-only, ordered message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// A transcript holding only the assistant greeting.
    pub fn seeded() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(SEED_GREETING)],
        }
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Snapshot of a session: transcript, unsent draft, and whether a request
/// is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) draft: String,
    pub(crate) pending: bool,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            transcript: Transcript::seeded(),
            draft: String::new(),
            pending: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
