//! Drops notifications the viewer can never act on.

use serde_json::Value;
use tracing::debug;

use campus_types::api::decode_notifications;
use campus_types::models::NotificationRecord;

/// Removes ride requests that carry no seat reference. Order is preserved and
/// everything else passes through untouched.
pub fn filter_valid_notifications(
    notifications: impl IntoIterator<Item = NotificationRecord>,
) -> Vec<NotificationRecord> {
    notifications
        .into_iter()
        .filter(|n| !n.is_orphaned())
        .collect()
}

/// Decodes a raw backend page and reconciles it. Never fails: malformed
/// entries are demoted to `Other` and kept.
pub fn reconcile_page(body: Value) -> Vec<NotificationRecord> {
    let decoded = decode_notifications(body);
    let total = decoded.len();
    let kept = filter_valid_notifications(decoded);
    debug!("Reconciled notifications: kept {} of {}", kept.len(), total);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::models::{NotificationKind, RequestId};
    use chrono::Utc;
    use serde_json::json;

    fn record(id: &str, kind: NotificationKind, reference: Option<&str>) -> NotificationRecord {
        NotificationRecord {
            id: id.into(),
            kind,
            reference_id: reference.map(RequestId::from),
            content: String::new(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn orphaned_ride_request_is_dropped() {
        let input = vec![
            record("n1", NotificationKind::RideRequest, None),
            record("n2", NotificationKind::Comment, None),
        ];

        let output = filter_valid_notifications(input);

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].id.as_str(), "n2");
        assert_eq!(output[0].reference_id, None);
    }

    #[test]
    fn blank_seat_reference_is_dropped() {
        let input = vec![
            record("n1", NotificationKind::RideRequest, Some("")),
            record("n2", NotificationKind::RideRequest, Some("   ")),
            record("n3", NotificationKind::RideRequest, Some("seat-3")),
        ];

        let output = filter_valid_notifications(input);

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].id.as_str(), "n3");
    }

    #[test]
    fn keeps_order_and_referenced_requests() {
        let input = vec![
            record("a", NotificationKind::FriendRequest, None),
            record("b", NotificationKind::RideRequest, Some("seat-1")),
            record("c", NotificationKind::RideRequest, None),
            record("d", NotificationKind::DirectMessage, None),
            record("e", NotificationKind::RideRequest, Some("seat-2")),
        ];
        let total = input.len();

        let output = filter_valid_notifications(input);
        let ids: Vec<_> = output.iter().map(|n| n.id.as_str()).collect();

        assert_eq!(ids, ["a", "b", "d", "e"]);
        assert!(output.len() <= total);
        assert!(
            output
                .iter()
                .filter(|n| n.kind == NotificationKind::RideRequest)
                .all(|n| n.reference_id.is_some())
        );
    }

    #[test]
    fn empty_input() {
        assert!(filter_valid_notifications(Vec::new()).is_empty());
    }

    #[test]
    fn raw_page_with_malformed_entries() {
        let page = json!([
            { "id_notificacion": "n1", "tipo": "solicitud_ruta", "fecha_envio": "2025-03-05T10:00:00" },
            { "id_notificacion": "n2", "tipo": "solicitud_ruta", "id_referencia": "seat-7",
              "fecha_envio": "2025-03-05T10:00:00" },
            { "id_notificacion": "n3", "tipo": "solicitud_ruta" },
            "garbage"
        ]);

        let kept = reconcile_page(page);
        let kinds: Vec<_> = kept.iter().map(|n| (n.id.as_str(), n.kind)).collect();

        assert_eq!(
            kinds,
            [
                ("n2", NotificationKind::RideRequest),
                ("n3", NotificationKind::Other),
                ("", NotificationKind::Other),
            ]
        );
    }
}
