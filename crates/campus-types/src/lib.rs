//! Shared data model for the campus social core: request and notification
//! records, conversation messages, refresh topics and wire decoding.

pub mod api;
pub mod events;
pub mod models;
