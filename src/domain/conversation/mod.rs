//! Conversation transcript and the messaging-surface collaborator

mod message;
mod source;

pub use message::ConversationMessage;
pub use source::{ConversationSource, InsertionPoint};

#[cfg(test)]
pub use source::mock::MockConversationSource;
