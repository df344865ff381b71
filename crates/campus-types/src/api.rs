use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::{NotificationId, NotificationKind, NotificationRecord, RequestId};

// -- Notifications --

/// A notification exactly as the campus backend sends it. Every field is
/// optional so that decoding itself never fails on missing data.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WireNotification {
    #[serde(default)]
    pub id_notificacion: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub id_referencia: Option<String>,
    #[serde(default)]
    pub contenido: Option<String>,
    #[serde(default)]
    pub leida: Option<bool>,
    #[serde(default)]
    pub fecha_envio: Option<String>,
}

impl WireNotification {
    /// Converts to the domain record. Records missing an id, a type or a
    /// timestamp are kept, but demoted to `Other`.
    pub fn into_record(self) -> NotificationRecord {
        let created_at = self.fecha_envio.as_deref().and_then(parse_timestamp);
        let complete = self.id_notificacion.is_some() && self.tipo.is_some() && created_at.is_some();

        let kind = match (&self.tipo, complete) {
            (Some(tipo), true) => NotificationKind::from_wire(tipo),
            _ => NotificationKind::Other,
        };

        NotificationRecord {
            id: NotificationId::new(self.id_notificacion.unwrap_or_default()),
            kind,
            reference_id: self
                .id_referencia
                .filter(|r| !r.trim().is_empty())
                .map(RequestId::new),
            content: self.contenido.unwrap_or_default(),
            read: self.leida.unwrap_or(false),
            created_at: created_at.unwrap_or_default(),
        }
    }
}

impl From<&NotificationRecord> for WireNotification {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            id_notificacion: Some(record.id.to_string()),
            tipo: Some(record.kind.wire_name().to_string()),
            id_referencia: record.reference_id.as_ref().map(ToString::to_string),
            contenido: Some(record.content.clone()),
            leida: Some(record.read),
            fecha_envio: Some(record.created_at.to_rfc3339()),
        }
    }
}

/// Decodes one raw notification. Values that are not even objects of the
/// expected shape still produce an `Other` record.
pub fn decode_notification(value: Value) -> NotificationRecord {
    match serde_json::from_value::<WireNotification>(value.clone()) {
        Ok(wire) => wire.into_record(),
        Err(e) => {
            warn!("Malformed notification demoted to Other: {}", e);
            let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
            WireNotification {
                id_notificacion: text("id_notificacion"),
                contenido: text("contenido"),
                ..WireNotification::default()
            }
            .into_record()
        }
    }
}

/// Decodes a notification page. A body that is not an array yields no records.
pub fn decode_notifications(body: Value) -> Vec<NotificationRecord> {
    match body {
        Value::Array(items) => items.into_iter().map(decode_notification).collect(),
        other => {
            warn!("Expected a notification array, got {}", json_kind(&other));
            vec![]
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts RFC 3339 as well as the naive ISO form the backend writes
/// (`datetime.utcnow().isoformat()`), which is UTC without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Some(ts);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}
