//! "Mark read on open, exactly once per session."
//!
//! A session starts when a conversation is opened and ends when the viewer
//! navigates away. Each session triggers at most one mark-read call; the call
//! is idempotent on the backend, so overlapping sessions for the same
//! conversation are harmless.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use campus_types::models::ConversationId;

use crate::backend::MessagingApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This call issued the mark-read request and it succeeded.
    Marked,
    /// The session already issued its call.
    AlreadyMarked,
    /// The call failed. Logged only; the session will not retry.
    Failed,
    /// The session was ended before the call.
    Closed,
}

struct Session {
    conversation_id: ConversationId,
    marked: bool,
}

#[derive(Default)]
struct ReadState {
    sessions: HashMap<SessionToken, Session>,
    /// Most recent session per conversation.
    latest: HashMap<ConversationId, SessionToken>,
    unread: HashMap<ConversationId, u32>,
}

pub struct ReadSync {
    api: Arc<dyn MessagingApi>,
    state: Mutex<ReadState>,
}

impl ReadSync {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self {
            api,
            state: Mutex::new(ReadState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self, conversation_id: &ConversationId) -> SessionToken {
        let token = SessionToken::new();
        let mut state = self.state();
        state.sessions.insert(
            token,
            Session {
                conversation_id: conversation_id.clone(),
                marked: false,
            },
        );
        state.latest.insert(conversation_id.clone(), token);
        debug!("Read session {} opened for {}", token, conversation_id);
        token
    }

    /// Invalidates the token. Ending an unknown token does nothing.
    pub fn end(&self, token: SessionToken) {
        let mut state = self.state();
        let Some(session) = state.sessions.remove(&token) else {
            return;
        };
        let cid = session.conversation_id;
        if state.latest.get(&cid) == Some(&token) {
            // Another open session of the same conversation takes over.
            let successor = state
                .sessions
                .iter()
                .find(|(_, s)| s.conversation_id == cid)
                .map(|(t, _)| *t);
            match successor {
                Some(next) => {
                    state.latest.insert(cid, next);
                }
                None => {
                    state.latest.remove(&cid);
                }
            }
        }
        debug!("Read session {} closed", token);
    }

    /// Ends every open session of the conversation, including the one
    /// `mark_opened_once` may have started.
    pub fn end_conversation(&self, conversation_id: &ConversationId) {
        let mut state = self.state();
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, s| &s.conversation_id != conversation_id);
        state.latest.remove(conversation_id);
        debug!(
            "Closed {} read session(s) for {}",
            before - state.sessions.len(),
            conversation_id
        );
    }

    pub fn open_sessions(&self) -> usize {
        self.state().sessions.len()
    }

    pub fn is_active(&self, token: SessionToken) -> bool {
        self.state().sessions.contains_key(&token)
    }

    /// Marks the session's conversation read unless this session already did.
    pub async fn mark_session_once(&self, token: SessionToken) -> ReadOutcome {
        let conversation_id = {
            let mut state = self.state();
            let Some(session) = state.sessions.get_mut(&token) else {
                return ReadOutcome::Closed;
            };
            if session.marked {
                return ReadOutcome::AlreadyMarked;
            }
            // Set before awaiting so a re-entrant call is a no-op.
            session.marked = true;
            session.conversation_id.clone()
        };

        match self.api.mark_conversation_read(&conversation_id).await {
            Ok(()) => {
                self.state().unread.insert(conversation_id, 0);
                ReadOutcome::Marked
            }
            Err(e) => {
                warn!("Failed to mark conversation {} read: {}", conversation_id, e);
                ReadOutcome::Failed
            }
        }
    }

    /// Uses the conversation's current session, opening one if there is none.
    pub async fn mark_opened_once(&self, conversation_id: &ConversationId) -> ReadOutcome {
        let existing = self.state().latest.get(conversation_id).copied();
        let token = match existing {
            Some(token) => token,
            None => self.begin(conversation_id),
        };
        self.mark_session_once(token).await
    }

    pub fn set_unread(&self, conversation_id: &ConversationId, count: u32) {
        self.state().unread.insert(conversation_id.clone(), count);
    }

    pub fn unread(&self, conversation_id: &ConversationId) -> u32 {
        self.state().unread.get(conversation_id).copied().unwrap_or(0)
    }
}
