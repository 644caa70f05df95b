//! Append-only conversation log.

use proto::{Message, Role, TimelineError};

/// Ordered message log for the current conversation.
///
/// Messages are never reordered or removed individually; only assistant
/// content may change after append.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` and returns its index.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Replaces the content of the assistant message at `index`.
    pub fn update_content(
        &mut self,
        index: usize,
        content: impl Into<String>,
    ) -> Result<(), TimelineError> {
        let len = self.messages.len();
        let message = self
            .messages
            .get_mut(index)
            .ok_or(TimelineError::OutOfRange { index, len })?;
        if message.role != Role::Assistant {
            return Err(TimelineError::NotAssistant(index));
        }
        message.content = content.into();
        Ok(())
    }

    /// Empties the timeline in one step.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// All messages in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }
}
