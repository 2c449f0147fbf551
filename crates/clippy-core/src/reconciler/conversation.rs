//! Merged view of both sides of a chat.
//!
//! Incoming events go through a [`Reconciler`]; messages this client sent are
//! kept alongside. [`Conversation::entries`] interleaves the two by timestamp.

use crate::protocol::{normalize, normalize_at};
use crate::types::{Message, StreamMessage};

use super::{Reconciler, Transition};

/// Which side produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Sent by this client
    Local,
    /// Received from the relay
    Remote,
}

/// How an entry should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Typing,
    Message,
}

/// A display row
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub origin: Origin,
    pub kind: EntryKind,
    pub text: String,
    pub timestamp: i64,
    pub message: Message,
}

impl ChatEntry {
    fn new(origin: Origin, message: &Message) -> Self {
        Self {
            origin,
            kind: if message.is_typing() {
                EntryKind::Typing
            } else {
                EntryKind::Message
            },
            text: message.text.clone(),
            timestamp: message.timestamp.unwrap_or_default(),
            message: message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    incoming: Reconciler,
    sent: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event from the subscription
    pub fn receive(&mut self, event: StreamMessage) -> Transition {
        self.incoming.apply(event)
    }

    /// Remember a message this client published
    pub fn record_sent(&mut self, message: Message) {
        self.sent.push(normalize(message));
    }

    /// Same as [`record_sent`](Self::record_sent) with an explicit clock
    pub fn record_sent_at(&mut self, message: Message, now: i64) {
        self.sent.push(normalize_at(message, now));
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.incoming
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.incoming
    }

    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    /// Both sides merged and ordered by timestamp
    ///
    /// The sort is stable: on equal timestamps incoming entries come first and
    /// each side keeps its own order.
    pub fn entries(&self) -> Vec<ChatEntry> {
        let mut entries: Vec<ChatEntry> = self
            .incoming
            .history()
            .iter()
            .map(|m| ChatEntry::new(Origin::Remote, m))
            .chain(self.sent.iter().map(|m| ChatEntry::new(Origin::Local, m)))
            .collect();
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.history().is_empty() && self.sent.is_empty()
    }

    /// Explicit user action: forget everything on both sides
    pub fn clear_all(&mut self) {
        self.incoming.reset();
        self.sent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClearScope;

    #[test]
    fn test_entries_are_ordered_by_timestamp_across_origins() {
        let mut conversation = Conversation::new();
        conversation.receive(Message::message("cli at 10").with_timestamp(10).into());
        conversation.receive(Message::message("cli at 30").with_timestamp(30).into());
        conversation.record_sent(Message::message("web at 20").with_timestamp(20));
        conversation.record_sent(Message::message("web at 5").with_timestamp(5));

        let entries = conversation.entries();
        let order: Vec<(&str, Origin)> = entries
            .iter()
            .map(|e| (e.text.as_str(), e.origin))
            .collect();
        assert_eq!(
            order,
            vec![
                ("web at 5", Origin::Local),
                ("cli at 10", Origin::Remote),
                ("web at 20", Origin::Local),
                ("cli at 30", Origin::Remote),
            ]
        );
    }

    #[test]
    fn test_equal_timestamps_keep_incoming_first() {
        let mut conversation = Conversation::new();
        conversation.record_sent(Message::message("sent").with_timestamp(7));
        conversation.receive(Message::message("received").with_timestamp(7).into());

        let entries = conversation.entries();
        assert_eq!(entries[0].origin, Origin::Remote);
        assert_eq!(entries[1].origin, Origin::Local);
    }

    #[test]
    fn test_typing_entries_are_marked() {
        let mut conversation = Conversation::new();
        conversation.receive(Message::typing("ty", true).with_timestamp(1).into());

        let entries = conversation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Typing);
    }

    #[test]
    fn test_record_sent_normalizes_timestamp() {
        let mut conversation = Conversation::new();
        conversation.record_sent_at(Message::message("hi"), 99);
        assert_eq!(conversation.sent()[0].timestamp, Some(99));
    }

    #[test]
    fn test_remote_clear_does_not_touch_sent_messages() {
        let mut conversation = Conversation::new();
        conversation.record_sent_at(Message::message("mine"), 1);
        conversation.receive(Message::message("theirs").with_timestamp(2).into());
        conversation.receive(Message::clear(ClearScope::All).with_timestamp(3).into());

        let entries = conversation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "mine");
    }

    #[test]
    fn test_clear_all() {
        let mut conversation = Conversation::new();
        conversation.record_sent_at(Message::message("mine"), 1);
        conversation.receive(Message::message("theirs").with_timestamp(2).into());
        assert!(!conversation.is_empty());

        conversation.clear_all();
        assert!(conversation.is_empty());
    }
}
