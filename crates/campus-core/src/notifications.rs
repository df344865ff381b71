use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use campus_events::EventDispatcher;
use campus_types::events::Topic;
use campus_types::models::{NotificationId, NotificationRecord, RequestId, RequestStatus};

use crate::backend::{NotificationApi, RequestApi};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::BackendError;
use crate::reconciler::filter_valid_notifications;
use crate::responder::RequestLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
}

impl NotificationFilter {
    pub fn matches(self, notification: &NotificationRecord) -> bool {
        match self {
            Self::All => true,
            Self::Unread => !notification.read,
        }
    }
}

/// Owns the viewer's reconciled notification feed and the set of requests
/// the viewer has answered. Other views learn about changes through the
/// dispatcher.
pub struct NotificationCenter {
    pub(crate) notifications_api: Arc<dyn NotificationApi>,
    pub(crate) requests_api: Arc<dyn RequestApi>,
    pub(crate) dispatcher: EventDispatcher,
    page_size: u32,
    feed: RwLock<Vec<NotificationRecord>>,
    pub(crate) ledger: Mutex<RequestLedger>,
    pub(crate) in_flight: Mutex<HashSet<RequestId>>,
}

impl NotificationCenter {
    pub fn new(
        notifications_api: Arc<dyn NotificationApi>,
        requests_api: Arc<dyn RequestApi>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            notifications_api,
            requests_api,
            dispatcher,
            page_size: DEFAULT_PAGE_SIZE,
            feed: RwLock::new(Vec::new()),
            ledger: Mutex::new(RequestLedger::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetches the first page, reconciles it and replaces the feed. Returns
    /// how many notifications were kept.
    pub async fn load(&self) -> Result<usize, BackendError> {
        let page = self
            .notifications_api
            .fetch_notifications(0, self.page_size)
            .await?;
        let total = page.len();
        let kept = filter_valid_notifications(page);
        debug!("Loaded notifications: kept {} of {}", kept.len(), total);

        let count = kept.len();
        *self.feed.write().unwrap_or_else(PoisonError::into_inner) = kept;
        Ok(count)
    }

    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), BackendError> {
        self.notifications_api.mark_notification_read(id).await?;
        self.set_read_locally(id);
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), BackendError> {
        self.notifications_api.mark_all_notifications_read().await?;
        let mut feed = self.feed.write().unwrap_or_else(PoisonError::into_inner);
        feed.iter_mut().for_each(NotificationRecord::mark_read);
        drop(feed);

        info!("Marked all notifications read");
        self.dispatcher.publish(Topic::NotificationsUpdated);
        Ok(())
    }

    pub(crate) fn set_read_locally(&self, id: &NotificationId) {
        let mut feed = self.feed.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(n) = feed.iter_mut().find(|n| &n.id == id) {
            n.mark_read();
        }
    }

    /// Snapshot of the feed, newest first.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.feed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn filtered(&self, filter: NotificationFilter) -> Vec<NotificationRecord> {
        self.feed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &NotificationId) -> Option<NotificationRecord> {
        self.feed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|n| &n.id == id)
            .cloned()
    }

    pub fn unread_count(&self) -> usize {
        self.feed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// Status of a request this center has decided or seen resolved.
    pub fn request_status(&self, id: &RequestId) -> Option<RequestStatus> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status(id)
    }

    /// Re-fetch after a change; a failure only costs freshness.
    pub(crate) async fn refresh_quietly(&self) {
        if let Err(e) = self.load().await {
            warn!("Failed to refresh notifications: {}", e);
        }
    }
}
