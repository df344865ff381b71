use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use campus_events::EventDispatcher;
use campus_types::events::Topic;
use campus_types::models::{ConversationId, ConversationMessage, MessageId, UserId};

use crate::backend::MessagingApi;
use crate::days::{DayGroup, Locale};
use crate::error::{BackendError, DeleteError, EditError, SendError};
use crate::read_sync::{ReadOutcome, ReadSync, SessionToken};
use crate::store::MessageStore;

struct OpenConversation {
    token: SessionToken,
    store: MessageStore,
}

/// The viewer's window onto one conversation at a time.
pub struct ConversationView {
    viewer: UserId,
    api: Arc<dyn MessagingApi>,
    read_sync: Arc<ReadSync>,
    dispatcher: EventDispatcher,
    zone: FixedOffset,
    locale: Locale,
    open: Option<OpenConversation>,
}

impl ConversationView {
    pub fn new(
        viewer: UserId,
        api: Arc<dyn MessagingApi>,
        read_sync: Arc<ReadSync>,
        dispatcher: EventDispatcher,
        zone: FixedOffset,
        locale: Locale,
    ) -> Self {
        Self {
            viewer,
            api,
            read_sync,
            dispatcher,
            zone,
            locale,
            open: None,
        }
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.open.as_ref().map(|o| o.store.conversation_id())
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        self.open
            .as_ref()
            .map(|o| o.store.messages())
            .unwrap_or_default()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Starts a read session, marks the conversation read once, then loads
    /// its history. A mark-read failure never prevents loading.
    pub async fn open(&mut self, conversation_id: &ConversationId) -> Result<ReadOutcome, BackendError> {
        self.close();

        let token = self.read_sync.begin(conversation_id);
        self.open = Some(OpenConversation {
            token,
            store: MessageStore::new(conversation_id.clone()),
        });
        info!("Opened conversation {}", conversation_id);

        let outcome = self.read_sync.mark_session_once(token).await;
        self.reload().await?;
        Ok(outcome)
    }

    /// Re-fetches the open conversation's history.
    pub async fn reload(&mut self) -> Result<(), BackendError> {
        let Some((conversation_id, token)) = self
            .open
            .as_ref()
            .map(|o| (o.store.conversation_id().clone(), o.token))
        else {
            return Ok(());
        };

        let history = self.api.fetch_conversation_messages(&conversation_id).await?;

        match self.open.as_mut() {
            Some(open) if open.token == token && self.read_sync.is_active(token) => {
                open.store.replace_all(history);
                debug!("Loaded {} messages for {}", open.store.len(), conversation_id);
            }
            _ => debug!("Discarding history for closed conversation {}", conversation_id),
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            self.read_sync.end(open.token);
            debug!("Closed conversation {}", open.store.conversation_id());
        }
    }

    pub async fn send(&mut self, body: &str) -> Result<ConversationMessage, SendError> {
        let conversation_id = self
            .conversation_id()
            .cloned()
            .ok_or(SendError::NotOpen)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(SendError::EmptyBody);
        }

        let sent = self.api.send_message(&conversation_id, body).await?;
        if let Some(open) = self.open.as_mut() {
            open.store.append(sent.clone());
        }
        self.dispatcher.publish(Topic::ConversationUpdated);
        Ok(sent)
    }

    /// Only the author may edit.
    pub async fn edit(&mut self, id: &MessageId, body: &str) -> Result<(), EditError> {
        let message = self
            .open
            .as_ref()
            .and_then(|o| o.store.get(id))
            .ok_or_else(|| EditError::Missing(id.clone()))?;
        if message.author_id != self.viewer {
            return Err(EditError::NotAuthor(id.clone()));
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(EditError::EmptyBody);
        }

        self.api.edit_message(id, body).await?;
        self.edit_local_message(id, body)?;
        self.dispatcher.publish(Topic::ConversationUpdated);
        Ok(())
    }

    /// Deleting a message that is already gone, locally or remotely, succeeds.
    pub async fn delete(&mut self, id: &MessageId) -> Result<(), DeleteError> {
        let open = self.open.as_ref().ok_or(DeleteError::NotOpen)?;
        let Some(message) = open.store.get(id) else {
            debug!("Message {} already removed", id);
            return Ok(());
        };
        if message.author_id != self.viewer {
            return Err(DeleteError::NotAuthor(id.clone()));
        }

        match self.api.delete_message(id).await {
            Ok(()) => {}
            Err(BackendError::NotFound(_)) => warn!("Message {} was already deleted remotely", id),
            Err(e) => return Err(e.into()),
        }
        self.remove_local_message(id);
        self.dispatcher.publish(Topic::ConversationUpdated);
        Ok(())
    }

    /// Entry point for messages pushed by the live stream.
    pub fn append_local_message(&mut self, message: ConversationMessage) -> bool {
        self.open
            .as_mut()
            .is_some_and(|o| o.store.append(message))
    }

    pub fn edit_local_message(&mut self, id: &MessageId, body: &str) -> Result<(), EditError> {
        match self.open.as_mut() {
            Some(open) => open.store.edit_body(id, body),
            None => Err(EditError::Missing(id.clone())),
        }
    }

    pub fn remove_local_message(&mut self, id: &MessageId) -> bool {
        self.open.as_mut().is_some_and(|o| o.store.remove(id))
    }

    /// Day buckets in the configured reference zone.
    pub fn grouped(&self, now: DateTime<Utc>) -> Vec<DayGroup> {
        self.open
            .as_ref()
            .map(|o| o.store.group_by_day(now, &self.zone))
            .unwrap_or_default()
    }
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        self.close();
    }
}
