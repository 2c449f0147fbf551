pub mod protocol;
pub mod reconciler;
pub mod typing;
pub mod types;

pub use protocol::{accept, normalize, normalize_at, validate, ValidationError};
pub use reconciler::{
    reduce, ChatEntry, ConnectionStatus, Conversation, EntryKind, Origin, Reconciler, Transition,
};
pub use typing::{TypingAction, TypingPolicy};
pub use types::{ClearScope, Message, MessageKind, Priority, StreamMessage};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
