use std::collections::HashMap;

use crate::api::models::{Message, MessageStatus};

/// Ordered message sequence for one contact, indexed by message id so a
/// provisional message can be swapped for the server copy without
/// touching its neighbours.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    index: HashMap<String, usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.position(id).map(|i| &self.messages[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Appends at the end. Duplicate ids are kept in the sequence; the index
    /// points at the first occurrence.
    pub fn push(&mut self, message: Message) {
        self.index.entry(message.id.clone()).or_insert(self.messages.len());
        self.messages.push(message);
    }

    /// Swaps the message with id `id` for `message`, keeping its position.
    /// Returns false when no such message exists.
    pub fn replace(&mut self, id: &str, message: Message) -> bool {
        let Some(pos) = self.index.remove(id) else {
            return false;
        };
        self.index.entry(message.id.clone()).or_insert(pos);
        self.messages[pos] = message;
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let pos = self.index.remove(id)?;
        let removed = self.messages.remove(pos);
        self.reindex();
        Some(removed)
    }

    pub fn set_status(&mut self, id: &str, status: Option<MessageStatus>) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.messages[pos].status = status;
                true
            }
            None => false,
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, message) in self.messages.iter().enumerate() {
            self.index.entry(message.id.clone()).or_insert(pos);
        }
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut conversation = Conversation::new();
        for message in iter {
            conversation.push(message);
        }
        conversation
    }
}
