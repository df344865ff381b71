//! Accept/reject for friendship and passenger-seat requests.
//!
//! A decision is one collaborator call. It is preceded by local checks (a
//! request reference must exist, no other decision may be pending, the
//! request must not be known to be resolved) and a single existence check.
//! Marking the notification read, refreshing the feed and signalling other
//! views all happen after a successful decision and are best effort.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use campus_types::events::Topic;
use campus_types::models::{
    Decision, NotificationId, NotificationRecord, RequestId, RequestKind, RequestStatus,
};

use crate::days::Locale;
use crate::error::{BackendError, RequestError};
use crate::notifications::NotificationCenter;

/// What a successful decision did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub notification_id: NotificationId,
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub status: RequestStatus,
    /// Signal published to other views.
    pub topic: Topic,
}

impl Resolution {
    pub fn summary(&self, locale: Locale) -> String {
        match locale {
            Locale::English => {
                let what = match self.kind {
                    RequestKind::FriendRequest => "Friend request",
                    RequestKind::RideSeatRequest => "Ride request",
                };
                format!("{} {}", what, self.status)
            }
            Locale::Spanish => {
                let what = match self.kind {
                    RequestKind::FriendRequest => "Solicitud de amistad",
                    RequestKind::RideSeatRequest => "Solicitud de viaje",
                };
                let status = match self.status {
                    RequestStatus::Pending => "pendiente",
                    RequestStatus::Accepted => "aceptada",
                    RequestStatus::Rejected => "rechazada",
                };
                format!("{} {}", what, status)
            }
        }
    }
}

/// Requests whose status this process has observed.
#[derive(Debug, Default)]
pub struct RequestLedger {
    known: HashMap<RequestId, RequestStatus>,
}

impl RequestLedger {
    pub fn status(&self, id: &RequestId) -> Option<RequestStatus> {
        self.known.get(id).copied()
    }

    pub fn record(&mut self, id: RequestId, status: RequestStatus) {
        self.known.insert(id, status);
    }

    pub fn is_resolved(&self, id: &RequestId) -> bool {
        self.status(id).is_some_and(RequestStatus::is_terminal)
    }
}

/// Holds a request's slot in the in-flight set until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<RequestId>>,
    id: RequestId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<RequestId>>, id: &RequestId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());
        inserted.then(|| Self {
            set,
            id: id.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl NotificationCenter {
    /// Answers the request behind `notification`.
    ///
    /// The operand is the notification's `reference_id`: the friendship id
    /// for friend requests, the passenger-seat id for ride requests. Without
    /// one the call fails with `StaleReference` before touching the network.
    pub async fn respond_to_request(
        &self,
        notification: &NotificationRecord,
        kind: RequestKind,
        decision: Decision,
    ) -> Result<Resolution, RequestError> {
        let reference = notification.reference_id.as_ref();
        let Some(request_id) = reference.filter(|id| !id.is_blank()).cloned() else {
            warn!(
                "Notification {} has no request reference; cannot {:?}",
                notification.id, decision
            );
            return Err(RequestError::StaleReference(notification.id.clone()));
        };

        // Keyed by request: two notifications may point at the same one.
        let _guard = InFlightGuard::acquire(&self.in_flight, &request_id)
            .ok_or_else(|| RequestError::InFlight(request_id.clone()))?;

        self.ensure_pending(&request_id, kind).await?;

        let decided = match kind {
            RequestKind::FriendRequest => {
                self.requests_api
                    .decide_friend_request(&request_id, decision)
                    .await
            }
            RequestKind::RideSeatRequest => {
                self.requests_api.decide_ride_seat(&request_id, decision).await
            }
        };

        if let Err(e) = decided {
            return Err(match e {
                BackendError::NotFound(_) | BackendError::Forbidden(_) => {
                    info!("Request {} was resolved elsewhere; refreshing", request_id);
                    self.refresh_quietly().await;
                    RequestError::NotFound(request_id.to_string())
                }
                other => other.into(),
            });
        }

        let status = decision.outcome();
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(request_id.clone(), status);
        info!("{} {} {}", kind.as_str(), request_id, status);

        self.after_decision(&notification.id).await;
        let topic = kind.topic();
        self.dispatcher.publish(topic);

        Ok(Resolution {
            notification_id: notification.id.clone(),
            request_id,
            kind,
            status,
            topic,
        })
    }

    /// Looks the notification up in the owned feed, then responds.
    pub async fn respond_by_id(
        &self,
        notification_id: &NotificationId,
        kind: RequestKind,
        decision: Decision,
    ) -> Result<Resolution, RequestError> {
        let notification = self
            .get(notification_id)
            .ok_or_else(|| RequestError::NotFound(notification_id.to_string()))?;
        self.respond_to_request(&notification, kind, decision).await
    }

    /// Local ledger first, then one existence check.
    async fn ensure_pending(&self, id: &RequestId, kind: RequestKind) -> Result<(), RequestError> {
        let resolved = self
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_resolved(id);
        if resolved {
            return Err(RequestError::NotFound(id.to_string()));
        }

        match self.requests_api.fetch_request(id).await? {
            Some(record) if record.kind != kind => {
                warn!(
                    "Request {} is a {}, not a {}",
                    id,
                    record.kind.as_str(),
                    kind.as_str()
                );
                Err(RequestError::NotFound(id.to_string()))
            }
            Some(record) if record.status.is_terminal() => {
                self.ledger
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(id.clone(), record.status);
                Err(RequestError::NotFound(id.to_string()))
            }
            Some(_) => Ok(()),
            None => Err(RequestError::NotFound(id.to_string())),
        }
    }

    async fn after_decision(&self, notification_id: &NotificationId) {
        match self.notifications_api.mark_notification_read(notification_id).await {
            Ok(()) => self.set_read_locally(notification_id),
            Err(e) => warn!("Failed to mark notification {} read: {}", notification_id, e),
        }
        self.refresh_quietly().await;
    }
}
