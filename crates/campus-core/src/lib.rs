//! Campus social core: notification reconciliation, request decisions,
//! conversation message state and read-state synchronization.
//!
//! Everything that talks to the campus backend goes through the traits in
//! `backend`; cross-view refreshes go through `campus_events::EventDispatcher`.

pub mod backend;
pub mod config;
pub mod conversation;
pub mod days;
pub mod error;
pub mod notifications;
pub mod read_sync;
pub mod reconciler;
pub mod responder;
pub mod store;

pub use backend::{MessagingApi, NotificationApi, RequestApi};
pub use config::CampusConfig;
pub use conversation::ConversationView;
pub use days::{DayGroup, DayLabel, Locale, group_messages_by_day};
pub use error::{BackendError, ConfigError, DeleteError, EditError, RequestError, SendError};
pub use notifications::{NotificationCenter, NotificationFilter};
pub use read_sync::{ReadOutcome, ReadSync, SessionToken};
pub use reconciler::{filter_valid_notifications, reconcile_page};
pub use responder::{RequestLedger, Resolution};
pub use store::MessageStore;
