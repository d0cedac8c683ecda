//! Ordered conversation log.
//!
//! Entries are only ever appended, except that the newest entry may be
//! retracted or replaced. Index 0 holds the greeting, which is never sent to
//! the backend. Keeping at most one placeholder is the caller's job.

use lumen_core::Message;

use crate::error::ChatError;

/// The single source of truth for what the conversation shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation with the introductory greeting at index 0.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(greeting)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Add an entry at the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop the newest entry and return it.
    pub fn remove_last(&mut self) -> Result<Message, ChatError> {
        self.messages.pop().ok_or(ChatError::EmptyConversation)
    }

    /// Swap the newest entry for `message` in one step.
    ///
    /// The length never dips in between, so a reader never sees a gap.
    pub fn replace_last(&mut self, message: Message) -> Result<Message, ChatError> {
        let slot = self
            .messages
            .last_mut()
            .ok_or(ChatError::EmptyConversation)?;
        Ok(std::mem::replace(slot, message))
    }

    /// History to send with a question: everything after the greeting,
    /// followed by `submitting` if a new message is being sent.
    pub fn snapshot_for_backend(&self, submitting: Option<&Message>) -> Vec<Message> {
        self.messages
            .iter()
            .skip(1)
            .chain(submitting)
            .cloned()
            .collect()
    }
}
