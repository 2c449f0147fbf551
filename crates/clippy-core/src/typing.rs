//! Producer-side typing indicator policy.
//!
//! Decides when a producer should announce that its user is typing and when
//! to retract that announcement after a period of inactivity. The policy owns
//! no timer; callers pass the current instant in and call [`TypingPolicy::poll`]
//! whenever their own loop wakes up.

use std::time::{Duration, Instant};

use crate::types::{ClearScope, Message};

/// Default inactivity window before a typing indicator is retracted
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Something the producer should publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingAction {
    /// Announce that the user started typing
    Start,
    /// Retract the typing indicator
    Clear,
}

impl TypingAction {
    /// Protocol message for this action; content is never sent
    pub fn into_message(self, session_id: Option<&str>) -> Message {
        let message = match self {
            TypingAction::Start => Message::typing("", true),
            TypingAction::Clear => Message::clear(ClearScope::Typing),
        };
        match session_id {
            Some(id) => message.with_session(id),
            None => message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypingPolicy {
    idle_timeout: Duration,
    indicator_sent: bool,
    deadline: Option<Instant>,
}

impl Default for TypingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl TypingPolicy {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            indicator_sent: false,
            deadline: None,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn indicator_sent(&self) -> bool {
        self.indicator_sent
    }

    /// When the caller should next [`poll`](Self::poll), if ever
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The input buffer changed to `text`
    pub fn on_input(&mut self, text: &str, now: Instant) -> Option<TypingAction> {
        if text.trim().is_empty() {
            self.deadline = None;
            return self.retract();
        }

        self.deadline = Some(now + self.idle_timeout);
        if self.indicator_sent {
            None
        } else {
            self.indicator_sent = true;
            Some(TypingAction::Start)
        }
    }

    /// Check the inactivity deadline
    pub fn poll(&mut self, now: Instant) -> Option<TypingAction> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.retract()
            }
            _ => None,
        }
    }

    /// The user submitted the message being typed
    pub fn on_submit(&mut self) -> Option<TypingAction> {
        self.deadline = None;
        self.retract()
    }

    fn retract(&mut self) -> Option<TypingAction> {
        if self.indicator_sent {
            self.indicator_sent = false;
            Some(TypingAction::Clear)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    #[test]
    fn test_start_is_sent_once() {
        let mut policy = TypingPolicy::default();
        let t0 = Instant::now();

        assert_eq!(policy.on_input("h", t0), Some(TypingAction::Start));
        assert_eq!(policy.on_input("he", t0 + Duration::from_millis(100)), None);
        assert!(policy.indicator_sent());
    }

    #[test]
    fn test_clear_after_idle_timeout() {
        let mut policy = TypingPolicy::new(Duration::from_millis(500));
        let t0 = Instant::now();

        policy.on_input("h", t0);
        assert_eq!(policy.poll(t0 + Duration::from_millis(499)), None);
        assert_eq!(
            policy.poll(t0 + Duration::from_millis(500)),
            Some(TypingAction::Clear)
        );
        // only once
        assert_eq!(policy.poll(t0 + Duration::from_millis(900)), None);
        assert!(!policy.indicator_sent());
    }

    #[test]
    fn test_input_rearms_deadline() {
        let mut policy = TypingPolicy::new(Duration::from_millis(500));
        let t0 = Instant::now();

        policy.on_input("h", t0);
        policy.on_input("he", t0 + Duration::from_millis(400));
        assert_eq!(policy.poll(t0 + Duration::from_millis(600)), None);
        assert_eq!(
            policy.deadline(),
            Some(t0 + Duration::from_millis(900))
        );
        assert_eq!(
            policy.poll(t0 + Duration::from_millis(900)),
            Some(TypingAction::Clear)
        );
    }

    #[test]
    fn test_empty_input_clears_immediately() {
        let mut policy = TypingPolicy::default();
        let t0 = Instant::now();

        policy.on_input("abc", t0);
        assert_eq!(policy.on_input("   ", t0), Some(TypingAction::Clear));
        assert_eq!(policy.deadline(), None);
        assert_eq!(policy.on_input("", t0), None);
    }

    #[test]
    fn test_submit_clears_only_when_indicator_sent() {
        let mut policy = TypingPolicy::default();
        assert_eq!(policy.on_submit(), None);

        policy.on_input("x", Instant::now());
        assert_eq!(policy.on_submit(), Some(TypingAction::Clear));
        assert_eq!(policy.on_submit(), None);
    }

    #[test]
    fn test_actions_build_protocol_messages() {
        let start = TypingAction::Start.into_message(Some("s1"));
        assert_eq!(
            start.kind,
            MessageKind::Typing {
                is_incremental: true
            }
        );
        assert_eq!(start.text, "");
        assert_eq!(start.session_id.as_deref(), Some("s1"));

        let clear = TypingAction::Clear.into_message(None);
        assert_eq!(
            clear.kind,
            MessageKind::Clear {
                clear_scope: Some(ClearScope::Typing)
            }
        );
    }
}
