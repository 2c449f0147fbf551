pub mod message;

pub use message::{ClearScope, Message, MessageKind, Priority, StreamMessage, CONNECTION_ESTABLISHED};
