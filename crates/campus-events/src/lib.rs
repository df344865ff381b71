//! Process-wide publish/subscribe dispatcher for refresh signals.

pub mod dispatcher;

pub use dispatcher::{EventDispatcher, Subscription};
