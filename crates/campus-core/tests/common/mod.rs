//! In-process stand-in for the campus backend that counts every call.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use campus_core::{BackendError, MessagingApi, NotificationApi, RequestApi};
use campus_types::models::{
    ConversationId, ConversationMessage, Decision, MessageId, NotificationId, NotificationKind,
    NotificationRecord, RequestId, RequestKind, RequestRecord, RequestStatus, UserId,
};

#[derive(Default)]
pub struct Calls {
    pub fetch_notifications: AtomicUsize,
    pub mark_notification_read: AtomicUsize,
    pub mark_all_read: AtomicUsize,
    pub fetch_request: AtomicUsize,
    pub decide_friend: AtomicUsize,
    pub decide_seat: AtomicUsize,
    pub fetch_messages: AtomicUsize,
    pub send: AtomicUsize,
    pub edit: AtomicUsize,
    pub delete: AtomicUsize,
    pub mark_conversation_read: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        [
            &self.fetch_notifications,
            &self.mark_notification_read,
            &self.mark_all_read,
            &self.fetch_request,
            &self.decide_friend,
            &self.decide_seat,
            &self.fetch_messages,
            &self.send,
            &self.edit,
            &self.delete,
            &self.mark_conversation_read,
        ]
        .into_iter()
        .map(Self::get)
        .sum()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Default)]
pub struct FakeCampus {
    pub viewer: UserId,
    pub calls: Calls,
    pub notifications: Mutex<Vec<NotificationRecord>>,
    pub requests: Mutex<HashMap<RequestId, RequestRecord>>,
    pub messages: Mutex<Vec<ConversationMessage>>,
    /// Operands of every decision call, in order.
    pub decided: Mutex<Vec<(RequestId, Decision)>>,
    pub last_limit: Mutex<Option<u32>>,
    /// Returned by the next decision call instead of applying it.
    pub decide_error: Mutex<Option<BackendError>>,
    pub delete_error: Mutex<Option<BackendError>>,
    pub mark_conversation_read_fails: bool,
}

impl FakeCampus {
    pub fn new(viewer: &str) -> Arc<Self> {
        Arc::new(Self {
            viewer: viewer.into(),
            ..Default::default()
        })
    }

    pub fn failing_read_marks(viewer: &str) -> Arc<Self> {
        Arc::new(Self {
            viewer: viewer.into(),
            mark_conversation_read_fails: true,
            ..Default::default()
        })
    }

    pub fn with_notification(&self, notification: NotificationRecord) {
        self.notifications.lock().unwrap().push(notification);
    }

    pub fn with_request(&self, id: &str, kind: RequestKind, status: RequestStatus) {
        let record = RequestRecord {
            id: id.into(),
            kind,
            status,
            initiator_id: "ana".into(),
            target_id: self.viewer.clone(),
        };
        self.requests.lock().unwrap().insert(id.into(), record);
    }

    pub fn with_message(&self, message: ConversationMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn fail_next_decision(&self, error: BackendError) {
        *self.decide_error.lock().unwrap() = Some(error);
    }

    pub fn fail_next_delete(&self, error: BackendError) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    fn apply(&self, id: &RequestId, decision: Decision) -> Result<(), BackendError> {
        self.decided.lock().unwrap().push((id.clone(), decision));
        if let Some(e) = self.decide_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut requests = self.requests.lock().unwrap();
        let record = requests
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("request {id}")))?;
        record
            .decide(decision)
            .map_err(|e| BackendError::NotFound(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for FakeCampus {
    async fn fetch_notifications(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, BackendError> {
        bump(&self.calls.fetch_notifications);
        *self.last_limit.lock().unwrap() = Some(limit);
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), BackendError> {
        bump(&self.calls.mark_notification_read);
        let mut notifications = self.notifications.lock().unwrap();
        let n = notifications
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("notification {id}")))?;
        n.read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), BackendError> {
        bump(&self.calls.mark_all_read);
        self.notifications
            .lock()
            .unwrap()
            .iter_mut()
            .for_each(|n| n.read = true);
        Ok(())
    }
}

#[async_trait]
impl RequestApi for FakeCampus {
    async fn fetch_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, BackendError> {
        bump(&self.calls.fetch_request);
        Ok(self.requests.lock().unwrap().get(id).cloned())
    }

    async fn decide_friend_request(
        &self,
        id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError> {
        bump(&self.calls.decide_friend);
        tokio::task::yield_now().await;
        self.apply(id, decision)
    }

    async fn decide_ride_seat(
        &self,
        seat_request_id: &RequestId,
        decision: Decision,
    ) -> Result<(), BackendError> {
        bump(&self.calls.decide_seat);
        tokio::task::yield_now().await;
        self.apply(seat_request_id, decision)
    }
}

#[async_trait]
impl MessagingApi for FakeCampus {
    async fn fetch_conversation_messages(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ConversationMessage>, BackendError> {
        bump(&self.calls.fetch_messages);
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.conversation_id == id)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        body: &str,
    ) -> Result<ConversationMessage, BackendError> {
        bump(&self.calls.send);
        let n = Calls::get(&self.calls.send);
        let message = ConversationMessage {
            id: format!("sent-{n}").into(),
            conversation_id: conversation_id.clone(),
            author_id: self.viewer.clone(),
            body: body.to_string(),
            sent_at: at(2025, 3, 5, 12, n as u32),
            edited: false,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn edit_message(&self, id: &MessageId, body: &str) -> Result<(), BackendError> {
        bump(&self.calls.edit);
        let mut messages = self.messages.lock().unwrap();
        let m = messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("message {id}")))?;
        m.body = body.to_string();
        m.edited = true;
        Ok(())
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), BackendError> {
        bump(&self.calls.delete);
        if let Some(e) = self.delete_error.lock().unwrap().take() {
            return Err(e);
        }
        self.messages.lock().unwrap().retain(|m| &m.id != id);
        Ok(())
    }

    async fn mark_conversation_read(&self, _id: &ConversationId) -> Result<(), BackendError> {
        bump(&self.calls.mark_conversation_read);
        if self.mark_conversation_read_fails {
            Err(BackendError::Network("timeout".into()))
        } else {
            Ok(())
        }
    }
}

/// Wall-clock time in UTC-04:00.
pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    campus_core::config::zone_from_minutes(-240)
        .unwrap()
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn notification(id: &str, kind: NotificationKind, reference: Option<&str>) -> NotificationRecord {
    NotificationRecord {
        id: id.into(),
        kind,
        reference_id: reference.map(RequestId::from),
        content: format!("{} {}", kind.label(), id),
        read: false,
        created_at: at(2025, 3, 5, 10, 0),
    }
}

pub fn message(id: &str, conversation: &str, author: &str, sent_at: DateTime<Utc>) -> ConversationMessage {
    ConversationMessage {
        id: id.into(),
        conversation_id: conversation.into(),
        author_id: author.into(),
        body: format!("body {id}"),
        sent_at,
        edited: false,
    }
}
