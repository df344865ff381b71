//! # Collaborator ports
//!
//! The REST transport, authentication and endpoint shapes live outside this
//! crate. Anything that implements these traits can drive the core; the
//! viewer's identity is part of the implementation, not of each call.

use async_trait::async_trait;

use campus_types::models::{
    ConversationId, ConversationMessage, Decision, MessageId, NotificationId, NotificationRecord,
    RequestId, RequestRecord,
};

use crate::error::BackendError;

/// The viewer's notification feed.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// One page of notifications, newest first.
    async fn fetch_notifications(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, BackendError>;

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), BackendError>;

    async fn mark_all_notifications_read(&self) -> Result<(), BackendError>;
}

/// Friendship and passenger-seat requests addressed to the viewer.
#[async_trait]
pub trait RequestApi: Send + Sync {
    /// Existence check. `None` when the backend does not know the id.
    async fn fetch_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, BackendError>;

    async fn decide_friend_request(
        &self,
        id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError>;

    async fn decide_ride_seat(
        &self,
        seat_request_id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError>;
}

/// Conversations the viewer takes part in.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn fetch_conversation_messages(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ConversationMessage>, BackendError>;

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        body: &str,
    ) -> Result<ConversationMessage, BackendError>;

    async fn edit_message(&self, id: &MessageId, body: &str) -> Result<(), BackendError>;

    async fn delete_message(&self, id: &MessageId) -> Result<(), BackendError>;

    /// Marks every message from other participants as read. Idempotent.
    async fn mark_conversation_read(&self, id: &ConversationId) -> Result<(), BackendError>;
}
