use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS requests (
            id              TEXT PRIMARY KEY,
            kind            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            initiator_id    TEXT NOT NULL,
            target_id       TEXT NOT NULL,
            detail          TEXT,
            created_at      TEXT NOT NULL,
            decided_at      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_requests_target
            ON requests(target_id, status);

        -- reference_id has no foreign key: rows written before reference
        -- tracking carry none, and the referenced kind varies with `kind`.
        CREATE TABLE IF NOT EXISTS notifications (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            kind            TEXT NOT NULL,
            reference_id    TEXT,
            content         TEXT NOT NULL,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            author_id       TEXT NOT NULL,
            body            TEXT NOT NULL,
            sent_at         TEXT NOT NULL,
            edited          INTEGER NOT NULL DEFAULT 0,
            read            INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, sent_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
