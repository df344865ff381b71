use thiserror::Error;

use campus_types::models::{MessageId, NotificationId, RequestId};

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The addressed resource does not exist (or is no longer in a state the
    /// call applies to).
    #[error("{0} not found")]
    NotFound(String),

    /// The resource exists but the viewer may not act on it.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transport failure or timeout. Retrying is left to the user.
    #[error("network error: {0}")]
    Network(String),
}

/// Why an accept/reject decision did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The notification carries no reference to a backing request. Nothing can
    /// repair this; the counterpart has to submit the request again.
    #[error("notification {0} has no backing request; ask the sender to submit it again")]
    StaleReference(NotificationId),

    /// The request was already decided (possibly by someone else) or is gone.
    #[error("request {0} was already resolved or no longer exists")]
    NotFound(String),

    /// A decision for this request is still waiting for its response.
    #[error("a decision for request {0} is already in progress")]
    InFlight(RequestId),

    #[error("network error: {0}")]
    Network(String),
}

impl RequestError {
    /// Whether re-issuing the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::InFlight(_))
    }
}

impl From<BackendError> for RequestError {
    /// A request the viewer may not decide is as good as gone.
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(what) | BackendError::Forbidden(what) => Self::NotFound(what),
            BackendError::Network(msg) => Self::Network(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Not in the local store, typically removed concurrently.
    #[error("message {0} is not in this conversation")]
    Missing(MessageId),

    #[error("only the author can edit message {0}")]
    NotAuthor(MessageId),

    #[error("message body cannot be empty")]
    EmptyBody,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("no conversation is open")]
    NotOpen,

    #[error("only the author can delete message {0}")]
    NotAuthor(MessageId),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("no conversation is open")]
    NotOpen,

    #[error("message body cannot be empty")]
    EmptyBody,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
