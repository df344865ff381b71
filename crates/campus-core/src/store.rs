use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use campus_types::models::{ConversationId, ConversationMessage, MessageId};

use crate::days::{DayGroup, group_messages_by_day};
use crate::error::EditError;

/// Messages of one conversation, kept in `sent_at` order no matter in which
/// order the network delivers them.
#[derive(Debug, Clone)]
pub struct MessageStore {
    conversation_id: ConversationId,
    messages: Vec<ConversationMessage>,
}

impl MessageStore {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Inserts in `sent_at` order, after any message with the same timestamp.
    /// Returns `false` for echoes of a known id or messages of another
    /// conversation.
    pub fn append(&mut self, message: ConversationMessage) -> bool {
        if message.conversation_id != self.conversation_id {
            debug!(
                "Ignoring message {} for conversation {} in {}",
                message.id, message.conversation_id, self.conversation_id
            );
            return false;
        }
        if self.get(&message.id).is_some() {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.sent_at <= message.sent_at);
        self.messages.insert(at, message);
        true
    }

    /// Replaces the whole contents with a fetched history.
    pub fn replace_all(&mut self, messages: impl IntoIterator<Item = ConversationMessage>) {
        self.messages.clear();
        for message in messages {
            self.append(message);
        }
    }

    /// The caller has already checked authorship.
    pub fn edit_body(&mut self, id: &MessageId, body: impl Into<String>) -> Result<(), EditError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| EditError::Missing(id.clone()))?;
        message.body = body.into();
        message.edited = true;
        Ok(())
    }

    /// Idempotent. Returns whether anything was removed.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| &m.id != id);
        self.messages.len() != before
    }

    pub fn get(&self, id: &MessageId) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn group_by_day<Tz: TimeZone>(&self, now: DateTime<Utc>, zone: &Tz) -> Vec<DayGroup> {
        group_messages_by_day(&self.messages, now, zone)
    }
}
