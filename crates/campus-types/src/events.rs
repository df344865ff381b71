use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::UnknownValue;

/// Refresh signals published after a domain changed.
///
/// Signals carry no payload: a subscriber re-fetches whatever it shows for
/// that domain. The serialized form is the topic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// A passenger-seat request was decided; ride lists are stale.
    #[serde(rename = "carpooling-updated")]
    CarpoolingUpdated,

    /// A friend request was decided; friend lists are stale.
    #[serde(rename = "friends-updated")]
    FriendsUpdated,

    /// The notification feed changed outside a request decision, e.g. it was
    /// bulk-marked read.
    #[serde(rename = "notifications-updated")]
    NotificationsUpdated,

    /// A conversation's messages or unread counter changed.
    #[serde(rename = "conversation-updated")]
    ConversationUpdated,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Self::CarpoolingUpdated,
        Self::FriendsUpdated,
        Self::NotificationsUpdated,
        Self::ConversationUpdated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CarpoolingUpdated => "carpooling-updated",
            Self::FriendsUpdated => "friends-updated",
            Self::NotificationsUpdated => "notifications-updated",
            Self::ConversationUpdated => "conversation-updated",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Topic {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.name() == s)
            .ok_or_else(|| UnknownValue {
                what: "topic",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_roundtrip_through_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.name()));
            assert_eq!(topic.name().parse::<Topic>().unwrap(), topic);
        }
    }
}
