use crate::Database;
use crate::models::{MessageRow, NotificationRow, RequestRow, RowChange};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use campus_types::models::{Decision, NotificationKind, RequestKind, RequestStatus};

/// Fixed-width UTC text so that lexical order is chronological.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Database {
    // -- Requests --

    /// Creates a pending friendship request and notifies its target.
    pub fn send_friend_request(&self, from: &str, to: &str) -> Result<String> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = insert_request(&tx, RequestKind::FriendRequest, from, to, None)?;
            insert_notification(
                &tx,
                to,
                NotificationKind::FriendRequest,
                Some(&id),
                &format!("{} te envió una solicitud de amistad", from),
            )?;
            tx.commit()?;
            Ok(id)
        })
    }

    /// Creates a pending passenger-seat request and notifies the driver. The
    /// notification references the seat request id.
    pub fn request_ride_seat(&self, passenger: &str, driver: &str, route_label: &str) -> Result<String> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = insert_request(
                &tx,
                RequestKind::RideSeatRequest,
                passenger,
                driver,
                Some(route_label),
            )?;
            insert_notification(
                &tx,
                driver,
                NotificationKind::RideRequest,
                Some(&id),
                &format!("{} solicita un asiento en {}", passenger, route_label),
            )?;
            tx.commit()?;
            Ok(id)
        })
    }

    /// A ride notification as written before reference tracking: no seat id.
    pub fn insert_legacy_ride_notification(&self, driver: &str, content: &str) -> Result<String> {
        self.with_conn(|conn| insert_notification(conn, driver, NotificationKind::RideRequest, None, content))
    }

    pub fn get_request(&self, id: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    /// Applies `decision` to a pending request of `kind` addressed to
    /// `viewer`. Returns `None` for anything else: unknown id, wrong kind,
    /// someone else's request, or a request that is already resolved.
    pub fn decide_request(
        &self,
        viewer: &str,
        id: &str,
        kind: RequestKind,
        decision: Decision,
    ) -> Result<Option<RequestStatus>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = query_request(&tx, id)? else {
                return Ok(None);
            };
            if row.kind != kind.as_str() || row.target_id != viewer {
                return Ok(None);
            }
            let current: RequestStatus = row.status.parse()?;
            let Ok(status) = current.apply(decision) else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE requests SET status = ?1, decided_at = ?2 WHERE id = ?3 AND status = 'pending'",
                params![status.as_str(), timestamp(Utc::now()), id],
            )?;

            match (kind, status) {
                (RequestKind::FriendRequest, RequestStatus::Accepted) => {
                    insert_notification(
                        &tx,
                        &row.initiator_id,
                        NotificationKind::FriendAccepted,
                        Some(id),
                        &format!("{} aceptó tu solicitud de amistad", viewer),
                    )?;
                }
                (RequestKind::FriendRequest, _) => {}
                (RequestKind::RideSeatRequest, status) => {
                    let verdict = match status {
                        RequestStatus::Accepted => "aceptada",
                        _ => "rechazada",
                    };
                    insert_notification(
                        &tx,
                        &row.initiator_id,
                        NotificationKind::Other,
                        Some(id),
                        &format!(
                            "Tu solicitud para {} fue {}",
                            row.detail.as_deref().unwrap_or("la ruta"),
                            verdict
                        ),
                    )?;
                }
            }

            tx.commit()?;
            info!("Request {} {} by {}", id, status, viewer);
            Ok(Some(status))
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        user_id: &str,
        kind: NotificationKind,
        reference_id: Option<&str>,
        content: &str,
    ) -> Result<String> {
        self.with_conn(|conn| insert_notification(conn, user_id, kind, reference_id, content))
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &str, offset: u32, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, reference_id, content, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(params![user_id, limit, offset], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        reference_id: row.get(3)?,
                        content: row.get(4)?,
                        read: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<RowChange> {
        self.with_conn(|conn| {
            let owner: Option<String> = conn
                .query_row("SELECT user_id FROM notifications WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            match owner {
                None => Ok(RowChange::Missing),
                Some(owner) if owner != user_id => Ok(RowChange::Forbidden),
                Some(_) => {
                    conn.execute("UPDATE notifications SET read = 1 WHERE id = ?1", [id])?;
                    Ok(RowChange::Applied)
                }
            }
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id],
            )?;
            Ok(changed)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        conversation_id: &str,
        author_id: &str,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let row = MessageRow {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            author_id: author_id.to_string(),
            body: body.to_string(),
            sent_at: timestamp(sent_at),
            edited: false,
            read: false,
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, author_id, body, sent_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.conversation_id, row.author_id, row.body, row.sent_at],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    /// Oldest first.
    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, author_id, body, sent_at, edited, read
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY sent_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([conversation_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        author_id: row.get(2)?,
                        body: row.get(3)?,
                        sent_at: row.get(4)?,
                        edited: row.get(5)?,
                        read: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn edit_message(&self, author_id: &str, id: &str, body: &str) -> Result<RowChange> {
        self.with_conn(|conn| {
            let change = message_ownership(conn, author_id, id)?;
            if change == RowChange::Applied {
                conn.execute(
                    "UPDATE messages SET body = ?1, edited = 1 WHERE id = ?2",
                    params![body, id],
                )?;
            }
            Ok(change)
        })
    }

    pub fn delete_message(&self, author_id: &str, id: &str) -> Result<RowChange> {
        self.with_conn(|conn| {
            let change = message_ownership(conn, author_id, id)?;
            if change == RowChange::Applied {
                conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            }
            Ok(change)
        })
    }

    /// Marks messages from the other participants read. Returns how many changed.
    pub fn mark_conversation_read(&self, viewer: &str, conversation_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1 WHERE conversation_id = ?1 AND author_id != ?2 AND read = 0",
                [conversation_id, viewer],
            )?;
            Ok(changed)
        })
    }

    pub fn unread_in_conversation(&self, viewer: &str, conversation_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1 AND author_id != ?2 AND read = 0",
                [conversation_id, viewer],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn insert_request(
    conn: &Connection,
    kind: RequestKind,
    initiator_id: &str,
    target_id: &str,
    detail: Option<&str>,
) -> Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO requests (id, kind, status, initiator_id, target_id, detail, created_at)
         VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6)",
        params![id, kind.as_str(), initiator_id, target_id, detail, timestamp(Utc::now())],
    )?;
    Ok(id)
}

fn insert_notification(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    reference_id: Option<&str>,
    content: &str,
) -> Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, reference_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, user_id, kind.wire_name(), reference_id, content, timestamp(Utc::now())],
    )?;
    Ok(id)
}

fn query_request(conn: &Connection, id: &str) -> Result<Option<RequestRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, status, initiator_id, target_id, detail, created_at FROM requests WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(RequestRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                status: row.get(2)?,
                initiator_id: row.get(3)?,
                target_id: row.get(4)?,
                detail: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn message_ownership(conn: &Connection, author_id: &str, id: &str) -> Result<RowChange> {
    let author: Option<String> = conn
        .query_row("SELECT author_id FROM messages WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(match author {
        None => RowChange::Missing,
        Some(author) if author != author_id => RowChange::Forbidden,
        Some(_) => RowChange::Applied,
    })
}
