//! Ingress gate for everything that enters a broadcast path.
//!
//! Both relay directions run raw payloads through [`validate`] and then
//! [`normalize`] before touching any registry.

use serde_json::Value;

use crate::types::{Message, MessageKind};

/// Why a published payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Message type is required")]
    MissingType,

    #[error("Text is required")]
    MissingText,

    #[error("Message must be a JSON object")]
    NotAnObject,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl ValidationError {
    /// Short machine-readable reason, used as a metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingType => "missing_type",
            Self::MissingText => "missing_text",
            Self::NotAnObject => "not_an_object",
            Self::UnknownType(_) => "unknown_type",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Validate a raw JSON payload into a typed [`Message`]
pub fn validate(raw: &Value) -> Result<Message, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let tag = match object.get("type") {
        None | Some(Value::Null) => return Err(ValidationError::MissingType),
        Some(Value::String(tag)) if tag.is_empty() => return Err(ValidationError::MissingType),
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => return Err(ValidationError::UnknownType(other.to_string())),
    };

    if !MessageKind::TAGS.contains(&tag) {
        return Err(ValidationError::UnknownType(tag.to_string()));
    }

    let has_text = object
        .get("text")
        .and_then(Value::as_str)
        .is_some_and(|text| !text.is_empty());
    if !has_text && tag != "clear" && tag != "typing" {
        return Err(ValidationError::MissingText);
    }

    serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// Current server time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fill in a missing timestamp with the current server time
pub fn normalize(message: Message) -> Message {
    normalize_at(message, now_millis())
}

/// Fill in a missing timestamp with `now`; an existing timestamp is kept
pub fn normalize_at(mut message: Message, now: i64) -> Message {
    if message.timestamp.is_none() {
        message.timestamp = Some(now);
    }
    message
}

/// [`validate`] followed by [`normalize`]
pub fn accept(raw: &Value) -> Result<Message, ValidationError> {
    validate(raw).map(normalize)
}
