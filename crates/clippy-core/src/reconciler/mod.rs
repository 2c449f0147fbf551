//! Client-side reconciliation of a subscription stream into display history.
//!
//! The transition is pure: given the current history and one incoming event
//! it produces the next history. Typing rows coalesce into a single trailing
//! entry, finalized messages supersede an in-flight typing row, and `clear`
//! drops entries according to its scope.

pub mod conversation;

pub use conversation::{ChatEntry, Conversation, EntryKind, Origin};

use crate::types::{ClearScope, Message, MessageKind, StreamMessage};

/// Connectivity of the subscription feeding a reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Connected"),
            ConnectionStatus::Connecting => write!(f, "◐ Connecting"),
            ConnectionStatus::Disconnected => write!(f, "○ Disconnected"),
        }
    }
}

/// What a single transition did to the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event was pushed onto the end of the history
    Appended,
    /// The event replaced the trailing typing entry
    Replaced,
    /// A clear removed `removed` entries
    Cleared { removed: usize },
    /// Connectivity changed; history untouched
    StatusOnly,
}

/// Scope a clear actually applies; unknown or absent scopes only drop typing rows
pub fn effective_scope(scope: Option<&ClearScope>) -> ClearScope {
    match scope {
        Some(ClearScope::All) => ClearScope::All,
        Some(ClearScope::Session) => ClearScope::Session,
        Some(ClearScope::Typing) | Some(ClearScope::Other(_)) | None => ClearScope::Typing,
    }
}

fn apply_message(history: &mut Vec<Message>, message: Message) -> Transition {
    if let MessageKind::Clear { clear_scope } = &message.kind {
        let before = history.len();
        match effective_scope(clear_scope.as_ref()) {
            ClearScope::All => history.clear(),
            ClearScope::Session => history.retain(|entry| {
                entry.session_id.is_none() || entry.session_id != message.session_id
            }),
            _ => history.retain(|entry| !entry.is_typing()),
        }
        return Transition::Cleared {
            removed: before - history.len(),
        };
    }

    // typing updates and finalized entries both take over a trailing typing row
    match history.last_mut() {
        Some(last) if last.is_typing() => {
            *last = message;
            Transition::Replaced
        }
        _ => {
            history.push(message);
            Transition::Appended
        }
    }
}

/// Fold one protocol message into `history`
pub fn reduce(mut history: Vec<Message>, message: Message) -> Vec<Message> {
    apply_message(&mut history, message);
    history
}

/// Stateful wrapper around [`reduce`] that also tracks connectivity
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    history: Vec<Message>,
    status: ConnectionStatus,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one stream event
    pub fn apply(&mut self, event: StreamMessage) -> Transition {
        match event {
            StreamMessage::ConnectionEstablished { .. } => {
                self.status = ConnectionStatus::Connected;
                Transition::StatusOnly
            }
            StreamMessage::Protocol(message) => apply_message(&mut self.history, message),
        }
    }

    /// Apply a sequence of events in order
    pub fn apply_all<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = StreamMessage>,
    {
        for event in events {
            self.apply(event);
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The in-flight typing entry, if any
    pub fn typing(&self) -> Option<&Message> {
        self.history.last().filter(|m| m.is_typing())
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn mark_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    pub fn mark_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    /// Explicit user reset
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
