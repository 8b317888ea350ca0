use async_trait::async_trait;

use super::ConversationMessage;
use crate::domain::DomainError;

/// Opaque handle to the place where a reply can be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionPoint(pub String);

/// Adapter for the messaging surface a conversation lives on. The pipeline
/// treats every method as opaque.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// Cache namespace dimension (e.g. "gmail", "slack")
    fn channel(&self) -> &str;

    async fn extract_messages(&self) -> Result<Vec<ConversationMessage>, DomainError>;

    async fn find_insertion_point(&self) -> Result<Option<InsertionPoint>, DomainError>;

    async fn insert_reply(&self, text: &str) -> Result<(), DomainError>;

    async fn thread_id(&self) -> Option<String>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    pub struct MockConversationSource {
        channel: String,
        messages: Vec<ConversationMessage>,
        thread_id: Option<String>,
        insertion_point: Option<InsertionPoint>,
        insert_error: Option<String>,
        inserted: Mutex<Vec<String>>,
    }

    impl MockConversationSource {
        pub fn new(channel: impl Into<String>) -> Self {
            Self {
                channel: channel.into(),
                messages: Vec::new(),
                thread_id: None,
                insertion_point: Some(InsertionPoint("compose-box".to_string())),
                insert_error: None,
                inserted: Mutex::new(Vec::new()),
            }
        }

        pub fn with_message(mut self, author: &str, text: &str) -> Self {
            self.messages.push(ConversationMessage::new(author, text));
            self
        }

        pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
            self.thread_id = Some(thread_id.into());
            self
        }

        pub fn without_insertion_point(mut self) -> Self {
            self.insertion_point = None;
            self
        }

        pub fn with_insert_error(mut self, error: impl Into<String>) -> Self {
            self.insert_error = Some(error.into());
            self
        }

        pub fn inserted(&self) -> Vec<String> {
            self.inserted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConversationSource for MockConversationSource {
        fn channel(&self) -> &str {
            &self.channel
        }

        async fn extract_messages(&self) -> Result<Vec<ConversationMessage>, DomainError> {
            Ok(self.messages.clone())
        }

        async fn find_insertion_point(&self) -> Result<Option<InsertionPoint>, DomainError> {
            Ok(self.insertion_point.clone())
        }

        async fn insert_reply(&self, text: &str) -> Result<(), DomainError> {
            if let Some(error) = &self.insert_error {
                return Err(DomainError::collaborator(error.clone()));
            }
            self.inserted.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn thread_id(&self) -> Option<String> {
            self.thread_id.clone()
        }
    }
}
