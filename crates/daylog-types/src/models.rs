use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account profile as seen by its owner. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Telegram user id bound through the link flow.
    pub channel_id: Option<String>,
    pub channel_username: Option<String>,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

/// A single journal note. `timestamp` is when the content was authored,
/// which for relayed messages is the chat send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
