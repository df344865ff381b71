use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::error;

use campus_core::{BackendError, MessagingApi, NotificationApi, RequestApi};
use campus_types::models::{
    ConversationId, ConversationMessage, Decision, MessageId, NotificationId, NotificationRecord,
    RequestId, RequestKind, RequestRecord, UserId,
};

use crate::Database;
use crate::models::RowChange;

/// Serves the collaborator ports from SQLite on behalf of one viewer.
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Database>,
    viewer: UserId,
}

impl LocalBackend {
    pub fn new(db: Arc<Database>, viewer: UserId) -> Self {
        Self { db, viewer }
    }

    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Runs blocking SQLite work off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&Database, &str) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let viewer = self.viewer.clone();
        tokio::task::spawn_blocking(move || f(&db, viewer.as_str()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                BackendError::Network(e.to_string())
            })?
            .map_err(|e| {
                error!("Database error: {}", e);
                BackendError::Network(e.to_string())
            })
    }

    async fn decide(
        &self,
        id: &RequestId,
        kind: RequestKind,
        decision: Decision,
    ) -> Result<(), BackendError> {
        let rid = id.to_string();
        let decided = self
            .blocking(move |db, viewer| db.decide_request(viewer, &rid, kind, decision))
            .await?;
        match decided {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound(format!("request {}", id))),
        }
    }
}

fn row_change(change: RowChange, what: String) -> Result<(), BackendError> {
    match change {
        RowChange::Applied => Ok(()),
        RowChange::Missing => Err(BackendError::NotFound(what)),
        RowChange::Forbidden => Err(BackendError::Forbidden(what)),
    }
}

#[async_trait]
impl NotificationApi for LocalBackend {
    async fn fetch_notifications(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, BackendError> {
        let rows = self
            .blocking(move |db, viewer| db.list_notifications(viewer, offset, limit))
            .await?;
        Ok(rows.into_iter().map(|row| row.into_record()).collect())
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), BackendError> {
        let nid = id.to_string();
        let change = self
            .blocking(move |db, viewer| db.mark_notification_read(viewer, &nid))
            .await?;
        row_change(change, format!("notification {}", id))
    }

    async fn mark_all_notifications_read(&self) -> Result<(), BackendError> {
        self.blocking(|db, viewer| db.mark_all_notifications_read(viewer))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RequestApi for LocalBackend {
    async fn fetch_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, BackendError> {
        let rid = id.to_string();
        self.blocking(move |db, _| db.get_request(&rid)?.map(|row| row.into_record()).transpose())
            .await
    }

    async fn decide_friend_request(
        &self,
        id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError> {
        self.decide(id, RequestKind::FriendRequest, decision).await
    }

    async fn decide_ride_seat(
        &self,
        seat_request_id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError> {
        self.decide(seat_request_id, RequestKind::RideSeatRequest, decision)
            .await
    }
}

#[async_trait]
impl MessagingApi for LocalBackend {
    async fn fetch_conversation_messages(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ConversationMessage>, BackendError> {
        let cid = id.to_string();
        let rows = self.blocking(move |db, _| db.list_messages(&cid)).await?;
        Ok(rows.into_iter().map(|row| row.into_message()).collect())
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        body: &str,
    ) -> Result<ConversationMessage, BackendError> {
        let cid = conversation_id.to_string();
        let body = body.to_string();
        let now = Utc::now();
        let row = self
            .blocking(move |db, viewer| db.insert_message(&cid, viewer, &body, now))
            .await?;
        Ok(row.into_message())
    }

    async fn edit_message(&self, id: &MessageId, body: &str) -> Result<(), BackendError> {
        let mid = id.to_string();
        let body = body.to_string();
        let change = self
            .blocking(move |db, viewer| db.edit_message(viewer, &mid, &body))
            .await?;
        row_change(change, format!("message {}", id))
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), BackendError> {
        let mid = id.to_string();
        let change = self
            .blocking(move |db, viewer| db.delete_message(viewer, &mid))
            .await?;
        row_change(change, format!("message {}", id))
    }

    async fn mark_conversation_read(&self, id: &ConversationId) -> Result<(), BackendError> {
        let cid = id.to_string();
        self.blocking(move |db, viewer| db.mark_conversation_read(viewer, &cid))
            .await?;
        Ok(())
    }
}
