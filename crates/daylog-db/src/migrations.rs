use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            email             TEXT NOT NULL UNIQUE,
            password          TEXT NOT NULL,
            channel_id        TEXT,
            channel_username  TEXT,
            timezone          TEXT NOT NULL DEFAULT 'UTC',
            created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- Two users must never resolve to the same Telegram identity
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_channel
            ON users(channel_id) WHERE channel_id IS NOT NULL;

        -- At most one outstanding token per user; a row always has both halves
        CREATE TABLE IF NOT EXISTS link_tokens (
            token       TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_link_tokens_expiry
            ON link_tokens(expires_at);

        CREATE TABLE IF NOT EXISTS entries (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_entries_user_time
            ON entries(user_id, timestamp);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
