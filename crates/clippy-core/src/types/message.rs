use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wire tag of the synthetic stream-readiness event
pub const CONNECTION_ESTABLISHED: &str = "connection-established";

/// Priority of a finalized `message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Which part of a receiver's history a `clear` drops
///
/// Scopes this build does not know are kept verbatim in [`ClearScope::Other`]
/// instead of failing, so they pass through the relay untouched and the
/// reconciler can fall back to clearing typing rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClearScope {
    All,
    Typing,
    Session,
    Other(String),
}

impl From<String> for ClearScope {
    fn from(scope: String) -> Self {
        match scope.as_str() {
            "all" => ClearScope::All,
            "typing" => ClearScope::Typing,
            "session" => ClearScope::Session,
            _ => ClearScope::Other(scope),
        }
    }
}

impl From<ClearScope> for String {
    fn from(scope: ClearScope) -> Self {
        scope.to_string()
    }
}

impl std::fmt::Display for ClearScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClearScope::All => write!(f, "all"),
            ClearScope::Typing => write!(f, "typing"),
            ClearScope::Session => write!(f, "session"),
            ClearScope::Other(scope) => write!(f, "{}", scope),
        }
    }
}

impl std::str::FromStr for ClearScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ClearScope::All),
            "typing" => Ok(ClearScope::Typing),
            "session" => Ok(ClearScope::Session),
            _ => Err(format!("Invalid clear scope: {}", s)),
        }
    }
}

/// Variant-specific part of a [`Message`], discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    /// In-progress input; superseded by the next typing or final message
    #[serde(rename_all = "camelCase")]
    Typing {
        #[serde(default)]
        is_incremental: bool,
    },
    /// Finalized text entry
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
    },
    /// CLI directive
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Vec<String>>,
    },
    /// Drop entries from the receiver's local history
    #[serde(rename_all = "camelCase")]
    Clear {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear_scope: Option<ClearScope>,
    },
    /// Fault notification; opaque to the relay
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        retryable: bool,
    },
}

impl MessageKind {
    /// Tags a client is allowed to publish
    pub const TAGS: [&'static str; 5] = ["typing", "message", "command", "clear", "error"];

    /// Wire value of the `type` tag
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::Typing { .. } => "typing",
            MessageKind::Message { .. } => "message",
            MessageKind::Command { .. } => "command",
            MessageKind::Clear { .. } => "clear",
            MessageKind::Error { .. } => "error",
        }
    }
}

/// A protocol message exchanged through the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// `null` reads as empty, like a missing key
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    /// Epoch milliseconds; the relay fills it in when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub kind: MessageKind,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    fn with_kind(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
            session_id: None,
            kind,
        }
    }

    /// Create a finalized text message
    pub fn message(text: impl Into<String>) -> Self {
        Self::with_kind(text, MessageKind::Message { priority: None })
    }

    /// Create a typing update
    pub fn typing(text: impl Into<String>, is_incremental: bool) -> Self {
        Self::with_kind(text, MessageKind::Typing { is_incremental })
    }

    /// Create a command invocation
    pub fn command(
        text: impl Into<String>,
        command: impl Into<String>,
        args: Option<Vec<String>>,
    ) -> Self {
        Self::with_kind(
            text,
            MessageKind::Command {
                command: command.into(),
                args,
            },
        )
    }

    /// Create a clear instruction; clears never carry text
    pub fn clear(scope: ClearScope) -> Self {
        Self::with_kind(
            "",
            MessageKind::Clear {
                clear_scope: Some(scope),
            },
        )
    }

    /// Create an error report
    pub fn error(text: impl Into<String>, error_code: Option<String>, retryable: bool) -> Self {
        Self::with_kind(
            text,
            MessageKind::Error {
                error_code,
                retryable,
            },
        )
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the priority; ignored for anything but `message`
    pub fn with_priority(mut self, priority: Priority) -> Self {
        if let MessageKind::Message { priority: p } = &mut self.kind {
            *p = Some(priority);
        }
        self
    }

    /// Wire value of the `type` tag
    pub fn message_type(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.kind, MessageKind::Typing { .. })
    }

    pub fn is_clear(&self) -> bool {
        matches!(self.kind, MessageKind::Clear { .. })
    }

    /// One-line detail for commands and errors, empty for other kinds
    pub fn detail(&self) -> String {
        match &self.kind {
            MessageKind::Command { command, args } => match args {
                Some(args) if !args.is_empty() => format!("Command: {} {}", command, args.join(" ")),
                _ => format!("Command: {}", command),
            },
            MessageKind::Error {
                error_code,
                retryable,
            } => {
                let mut detail = String::from("Error");
                if let Some(code) = error_code {
                    detail.push_str(&format!(" ({})", code));
                }
                if *retryable {
                    detail.push_str(" - Retryable");
                }
                detail
            }
            _ => String::new(),
        }
    }
}

/// One event on a subscription stream
///
/// `ConnectionEstablished` is generated by the relay only. It has no
/// [`MessageKind`] counterpart, so no published payload can carry it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    ConnectionEstablished { timestamp: i64 },
    Protocol(Message),
}

impl StreamMessage {
    pub fn connection_established(timestamp: i64) -> Self {
        Self::ConnectionEstablished { timestamp }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            StreamMessage::ConnectionEstablished { .. } => CONNECTION_ESTABLISHED,
            StreamMessage::Protocol(message) => message.message_type(),
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            StreamMessage::ConnectionEstablished { timestamp } => Some(*timestamp),
            StreamMessage::Protocol(message) => message.timestamp,
        }
    }
}

impl From<Message> for StreamMessage {
    fn from(message: Message) -> Self {
        Self::Protocol(message)
    }
}

impl Serialize for StreamMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StreamMessage::ConnectionEstablished { timestamp } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", CONNECTION_ESTABLISHED)?;
                map.serialize_entry("timestamp", timestamp)?;
                map.end()
            }
            StreamMessage::Protocol(message) => message.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for StreamMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("type").and_then(Value::as_str) == Some(CONNECTION_ESTABLISHED) {
            let timestamp = value
                .get("timestamp")
                .and_then(Value::as_i64)
                .ok_or_else(|| de::Error::missing_field("timestamp"))?;
            return Ok(Self::ConnectionEstablished { timestamp });
        }
        serde_json::from_value(value)
            .map(Self::Protocol)
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let msg = Message::message("hello")
            .with_priority(Priority::High)
            .with_session("s1")
            .with_timestamp(42);

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "message",
                "text": "hello",
                "timestamp": 42,
                "sessionId": "s1",
                "priority": "high",
            })
        );
    }

    #[test]
    fn test_variant_fields_are_camel_case() {
        let typing = serde_json::to_value(Message::typing("ab", true)).unwrap();
        assert_eq!(typing["isIncremental"], json!(true));

        let clear = serde_json::to_value(Message::clear(ClearScope::Session)).unwrap();
        assert_eq!(clear["clearScope"], json!("session"));
        assert_eq!(clear["text"], json!(""));

        let error = serde_json::to_value(Message::error("boom", Some("E42".into()), true)).unwrap();
        assert_eq!(error["errorCode"], json!("E42"));
        assert_eq!(error["retryable"], json!(true));
    }

    #[test]
    fn test_unknown_clear_scope_is_kept_verbatim() {
        let msg: Message =
            serde_json::from_value(json!({"type": "clear", "clearScope": "everything"})).unwrap();
        assert_eq!(
            msg.kind,
            MessageKind::Clear {
                clear_scope: Some(ClearScope::Other("everything".into()))
            }
        );
        assert_eq!(serde_json::to_value(&msg).unwrap()["clearScope"], json!("everything"));
    }

    #[test]
    fn test_command_args_preserve_order() {
        let msg: Message = serde_json::from_value(json!({
            "type": "command",
            "text": "run it",
            "command": "deploy",
            "args": ["--env", "prod", "--force"],
        }))
        .unwrap();

        match msg.kind {
            MessageKind::Command { command, args } => {
                assert_eq!(command, "deploy");
                assert_eq!(args.unwrap(), vec!["--env", "prod", "--force"]);
            }
            other => panic!("Expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_message_connection_established() {
        let event = StreamMessage::connection_established(1_700_000_000_000);
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(
            text,
            r#"{"type":"connection-established","timestamp":1700000000000}"#
        );

        let parsed: StreamMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_stream_message_wraps_protocol_messages() {
        let parsed: StreamMessage =
            serde_json::from_str(r#"{"type":"typing","text":"a","timestamp":5}"#).unwrap();
        assert_eq!(parsed.message_type(), "typing");
        assert_eq!(parsed.timestamp(), Some(5));
    }

    #[test]
    fn test_detail() {
        let cmd = Message::command("", "ls", Some(vec!["-la".into()]));
        assert_eq!(cmd.detail(), "Command: ls -la");

        let err = Message::error("failed", Some("TIMEOUT".into()), true);
        assert_eq!(err.detail(), "Error (TIMEOUT) - Retryable");

        assert_eq!(Message::message("hi").detail(), "");
    }
}
