use crate::models::{EntryRow, LinkResolution, UserRow};
use crate::{Database, format_timestamp, parse_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::debug;

const USER_COLUMNS: &str =
    "id, name, email, password, channel_id, channel_username, timezone, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, name: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, name, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns false when no such user exists.
    pub fn update_timezone(&self, id: &str, timezone: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET timezone = ?2 WHERE id = ?1",
                (id, timezone),
            )?;
            Ok(changed > 0)
        })
    }

    /// Maps a bound Telegram identity back to its user id.
    pub fn find_user_by_channel_id(&self, channel_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM users WHERE channel_id = ?1",
                [channel_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Link tokens --

    /// Stores a fresh token for the user, replacing any outstanding one.
    pub fn replace_link_token(&self, user_id: &str, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM link_tokens WHERE user_id = ?1", [user_id])?;
            tx.execute(
                "INSERT INTO link_tokens (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (token, user_id, format_timestamp(expires_at)),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Consumes a link token. A presented token is deleted whether it binds or
    /// has expired, so it can never be presented twice.
    ///
    /// On success the Telegram identity is bound to the token's owner. If that
    /// identity was bound to a different user, the old binding is cleared first.
    pub fn consume_link_token(
        &self,
        token: &str,
        channel_id: &str,
        channel_username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LinkResolution> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let found: Option<(String, String)> = tx
                .query_row(
                    "SELECT user_id, expires_at FROM link_tokens WHERE token = ?1",
                    [token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((user_id, expires_at)) = found else {
                return Ok(LinkResolution::NotFound);
            };

            tx.execute("DELETE FROM link_tokens WHERE token = ?1", [token])?;

            if now > parse_timestamp(&expires_at)? {
                tx.commit()?;
                return Ok(LinkResolution::Expired);
            }

            let moved = tx.execute(
                "UPDATE users SET channel_id = NULL, channel_username = NULL
                 WHERE channel_id = ?1 AND id != ?2",
                (channel_id, &user_id),
            )?;
            if moved > 0 {
                debug!("Telegram identity {} moved to user {}", channel_id, user_id);
            }

            tx.execute(
                "UPDATE users SET channel_id = ?2, channel_username = ?3 WHERE id = ?1",
                rusqlite::params![&user_id, channel_id, channel_username],
            )?;
            tx.commit()?;

            Ok(LinkResolution::Linked { user_id })
        })
    }

    /// Deletes tokens whose window has closed without being presented.
    pub fn prune_expired_link_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let pruned = conn.execute(
                "DELETE FROM link_tokens WHERE expires_at < ?1",
                [format_timestamp(now)],
            )?;
            Ok(pruned)
        })
    }

    pub fn has_link_token(&self, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM link_tokens WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Entries --

    /// Inserts an entry. Without an explicit timestamp the column default
    /// (the current time) applies. Returns `None` if the user does not exist.
    pub fn insert_entry(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Option<EntryRow>> {
        self.with_conn_mut(|conn| {
            let exists: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let row = match timestamp {
                Some(ts) => conn.query_row(
                    "INSERT INTO entries (id, user_id, content, timestamp) VALUES (?1, ?2, ?3, ?4)
                     RETURNING id, user_id, content, timestamp",
                    (id, user_id, content, format_timestamp(ts)),
                    entry_from_row,
                )?,
                None => conn.query_row(
                    "INSERT INTO entries (id, user_id, content) VALUES (?1, ?2, ?3)
                     RETURNING id, user_id, content, timestamp",
                    (id, user_id, content),
                    entry_from_row,
                )?,
            };
            Ok(Some(row))
        })
    }

    /// Entries for a user, newest first. With a range, both bounds are inclusive.
    pub fn list_entries(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<EntryRow>> {
        self.with_conn(|conn| match range {
            Some((start, end)) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, content, timestamp FROM entries
                     WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
                     ORDER BY timestamp DESC",
                )?;
                let rows = stmt
                    .query_map(
                        (user_id, format_timestamp(start), format_timestamp(end)),
                        entry_from_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, content, timestamp FROM entries
                     WHERE user_id = ?1
                     ORDER BY timestamp DESC",
                )?;
                let rows = stmt
                    .query_map([user_id], entry_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }

    /// Owner-scoped content update. `None` if the entry does not exist or
    /// belongs to someone else.
    pub fn update_entry_content(&self, id: &str, user_id: &str, content: &str) -> Result<Option<EntryRow>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                "UPDATE entries SET content = ?3 WHERE id = ?1 AND user_id = ?2
                 RETURNING id, user_id, content, timestamp",
                (id, user_id, content),
                entry_from_row,
            )
            .optional()
        })
    }

    /// Owner-scoped delete. Returns false if nothing matched.
    pub fn delete_entry(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM entries WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                channel_id: row.get(4)?,
                channel_username: row.get(5)?,
                timezone: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
