//! Database row types. These map directly to SQLite rows and stay separate
//! from the campus-types records so the storage layout can change freely.

use anyhow::{Result, anyhow};
use tracing::warn;

use campus_types::api::{WireNotification, parse_timestamp};
use campus_types::models::{
    ConversationMessage, NotificationRecord, RequestKind, RequestRecord, RequestStatus,
};

pub struct RequestRow {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub initiator_id: String,
    pub target_id: String,
    /// Route label for seat requests.
    pub detail: Option<String>,
    pub created_at: String,
}

impl RequestRow {
    pub fn into_record(self) -> Result<RequestRecord> {
        Ok(RequestRecord {
            id: self.id.into(),
            kind: self.kind.parse::<RequestKind>().map_err(|e| anyhow!("request row: {}", e))?,
            status: self.status.parse::<RequestStatus>().map_err(|e| anyhow!("request row: {}", e))?,
            initiator_id: self.initiator_id.into(),
            target_id: self.target_id.into(),
        })
    }
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    /// Backend type string, e.g. `solicitud_ruta`.
    pub kind: String,
    pub reference_id: Option<String>,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationRow {
    /// Goes through the same decoding as a remote page.
    pub fn into_record(self) -> NotificationRecord {
        WireNotification {
            id_notificacion: Some(self.id),
            tipo: Some(self.kind),
            id_referencia: self.reference_id,
            contenido: Some(self.content),
            leida: Some(self.read),
            fecha_envio: Some(self.created_at),
        }
        .into_record()
    }
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub body: String,
    pub sent_at: String,
    pub edited: bool,
    pub read: bool,
}

impl MessageRow {
    pub fn into_message(self) -> ConversationMessage {
        let sent_at = parse_timestamp(&self.sent_at).unwrap_or_else(|| {
            warn!("Message {} has unparsable sent_at {:?}", self.id, self.sent_at);
            Default::default()
        });
        ConversationMessage {
            id: self.id.into(),
            conversation_id: self.conversation_id.into(),
            author_id: self.author_id.into(),
            body: self.body,
            sent_at,
            edited: self.edited,
        }
    }
}

/// Result of a write that is restricted to the row's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Applied,
    Missing,
    Forbidden,
}
