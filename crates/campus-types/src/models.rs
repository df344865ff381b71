use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::Topic;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for ids that were missing or empty on the wire.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identifies a friendship request or a passenger-seat request.
    RequestId
);
opaque_id!(NotificationId);
opaque_id!(ConversationId);
opaque_id!(MessageId);
opaque_id!(UserId);

// -- Requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    FriendRequest,
    RideSeatRequest,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FriendRequest => "friend_request",
            Self::RideSeatRequest => "ride_seat_request",
        }
    }

    /// The notification kind the backend emits when a request of this kind is created.
    pub fn notification_kind(self) -> NotificationKind {
        match self {
            Self::FriendRequest => NotificationKind::FriendRequest,
            Self::RideSeatRequest => NotificationKind::RideRequest,
        }
    }

    /// Which request, if any, a notification of `kind` lets the viewer answer.
    pub fn for_notification(kind: NotificationKind) -> Option<Self> {
        match kind {
            NotificationKind::FriendRequest => Some(Self::FriendRequest),
            NotificationKind::RideRequest => Some(Self::RideSeatRequest),
            _ => None,
        }
    }

    /// Refresh topic other views listen on after a decision of this kind.
    pub fn topic(self) -> Topic {
        match self {
            Self::FriendRequest => Topic::FriendsUpdated,
            Self::RideSeatRequest => Topic::CarpoolingUpdated,
        }
    }
}

impl FromStr for RequestKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend_request" => Ok(Self::FriendRequest),
            "ride_seat_request" => Ok(Self::RideSeatRequest),
            other => Err(UnknownValue::new("request kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Pending is the only state with outgoing transitions.
    pub fn apply(self, decision: Decision) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(decision.outcome()),
            resolved => Err(TransitionError::AlreadyResolved(resolved)),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownValue::new("request status", other)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn outcome(self) -> RequestStatus {
        match self {
            Self::Accept => RequestStatus::Accepted,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" | "aceptar" => Ok(Self::Accept),
            "reject" | "rechazar" => Ok(Self::Reject),
            other => Err(UnknownValue::new("decision", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub initiator_id: UserId,
    pub target_id: UserId,
}

impl RequestRecord {
    pub fn pending(id: RequestId, kind: RequestKind, initiator_id: UserId, target_id: UserId) -> Self {
        Self {
            id,
            kind,
            status: RequestStatus::Pending,
            initiator_id,
            target_id,
        }
    }

    pub fn decide(&mut self, decision: Decision) -> Result<RequestStatus, TransitionError> {
        self.status = self.status.apply(decision)?;
        Ok(self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("request already {0}")]
    AlreadyResolved(RequestStatus),
}

// -- Notifications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    Reaction,
    FriendRequest,
    FriendAccepted,
    RideRequest,
    DirectMessage,
    NewGrade,
    Other,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 8] = [
        Self::Comment,
        Self::Reaction,
        Self::FriendRequest,
        Self::FriendAccepted,
        Self::RideRequest,
        Self::DirectMessage,
        Self::NewGrade,
        Self::Other,
    ];

    /// Type string used by the campus backend.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Comment => "comentario",
            Self::Reaction => "reaccion",
            Self::FriendRequest => "solicitud_amistad",
            Self::FriendAccepted => "amistad_aceptada",
            Self::RideRequest => "solicitud_ruta",
            Self::DirectMessage => "mensaje",
            Self::NewGrade => "nota_nueva",
            Self::Other => "otro",
        }
    }

    /// Unknown or missing type strings decode to `Other`.
    pub fn from_wire(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == name)
            .unwrap_or(Self::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Comment => "Comment",
            Self::Reaction => "Reaction",
            Self::FriendRequest => "Friend request",
            Self::FriendAccepted => "Friend request accepted",
            Self::RideRequest => "Ride request",
            Self::DirectMessage => "Message",
            Self::NewGrade => "New grade",
            Self::Other => "Notification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub kind: NotificationKind,
    /// Back-reference to the request (or other entity) this event is about.
    pub reference_id: Option<RequestId>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Ride requests created before reference tracking carry no seat id (or
    /// a blank one) and can never be answered.
    pub fn is_orphaned(&self) -> bool {
        self.kind == NotificationKind::RideRequest
            && self.reference_id.as_ref().is_none_or(RequestId::is_blank)
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

// -- Messages --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub edited: bool,
}

// -- Parsing --

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value:?}")]
pub struct UnknownValue {
    pub what: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: RequestStatus) -> RequestRecord {
        RequestRecord {
            id: "r1".into(),
            kind: RequestKind::FriendRequest,
            status,
            initiator_id: "ana".into(),
            target_id: "luis".into(),
        }
    }

    #[test]
    fn pending_transitions_to_decision_outcome() {
        let mut accepted = request(RequestStatus::Pending);
        assert_eq!(accepted.decide(Decision::Accept), Ok(RequestStatus::Accepted));

        let mut rejected = request(RequestStatus::Pending);
        assert_eq!(rejected.decide(Decision::Reject), Ok(RequestStatus::Rejected));
    }

    #[test]
    fn terminal_states_never_move() {
        for status in [RequestStatus::Accepted, RequestStatus::Rejected] {
            for decision in [Decision::Accept, Decision::Reject] {
                let mut record = request(status);
                assert_eq!(
                    record.decide(decision),
                    Err(TransitionError::AlreadyResolved(status))
                );
                assert_eq!(record.status, status);
            }
        }
    }

    #[test]
    fn notification_kind_wire_names() {
        for kind in NotificationKind::ALL {
            assert_eq!(NotificationKind::from_wire(kind.wire_name()), kind);
        }
        assert_eq!(NotificationKind::from_wire("respuesta_ruta"), NotificationKind::Other);
        assert_eq!(NotificationKind::from_wire(""), NotificationKind::Other);
    }

    #[test]
    fn only_request_notifications_are_answerable() {
        assert_eq!(
            RequestKind::for_notification(NotificationKind::RideRequest),
            Some(RequestKind::RideSeatRequest)
        );
        assert_eq!(
            RequestKind::for_notification(NotificationKind::FriendRequest),
            Some(RequestKind::FriendRequest)
        );
        assert_eq!(RequestKind::for_notification(NotificationKind::FriendAccepted), None);
        assert_eq!(RequestKind::RideSeatRequest.topic(), Topic::CarpoolingUpdated);
    }

    #[test]
    fn decisions_parse_in_both_languages() {
        assert_eq!("accept".parse(), Ok(Decision::Accept));
        assert_eq!("Rechazar".parse(), Ok(Decision::Reject));
        assert!("maybe".parse::<Decision>().is_err());
    }
}
