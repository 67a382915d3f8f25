//! Database row types — these map directly to SQLite rows.
//! Distinct from daylog-types API models to keep the DB layer independent.
use anyhow::{Context, Result};
use daylog_types::models::{Entry, User};

use crate::parse_timestamp;

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub channel_id: Option<String>,
    pub channel_username: Option<String>,
    pub timezone: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.parse().with_context(|| format!("Corrupt user id '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            name: self.name,
            email: self.email,
            channel_id: self.channel_id,
            channel_username: self.channel_username,
            timezone: self.timezone,
        })
    }
}

pub struct EntryRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: String,
}

impl EntryRow {
    pub fn into_entry(self) -> Result<Entry> {
        Ok(Entry {
            id: self.id.parse().with_context(|| format!("Corrupt entry id '{}'", self.id))?,
            user_id: self
                .user_id
                .parse()
                .with_context(|| format!("Corrupt user_id '{}' on entry '{}'", self.user_id, self.id))?,
            timestamp: parse_timestamp(&self.timestamp)?,
            content: self.content,
        })
    }
}

/// Outcome of presenting a link token. Unknown and expired tokens are
/// expected outcomes, not store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    Linked { user_id: String },
    NotFound,
    Expired,
}
