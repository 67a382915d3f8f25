use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::backend::{BackendError, DaylogClient};
use crate::commands::{Command, parse, yesterday_noon};
use crate::telegram::Message;

pub const LINKED: &str =
    "✅ Account linked successfully! You can now send messages to create entries.";
pub const WELCOME: &str = "Welcome to Daylog! Please link your account from the website first.";
pub const INVALID_LINK: &str = "Invalid link. Please try again from the website.";
pub const NOT_LINKED: &str =
    "Your account is not linked. Please link your account from the website first.";
pub const YESTERDAY_EMPTY: &str = "Can't create entry for yesterday with no content!";
pub const ENTRY_RECORDED: &str = "✅ Entry recorded!";
pub const YESTERDAY_RECORDED: &str = "✅ Entry recorded for yesterday!";
pub const ENTRY_FAILED: &str = "Failed to create entry. Please try again.";
pub const GENERIC_ERROR: &str = "An error occurred. Please try again later.";

/// Handles one inbound chat message and returns the reply to send, if any.
pub async fn handle_message(message: &Message, backend: &DaylogClient) -> Option<String> {
    let text = message.text.as_deref()?;
    let sender = message.from.as_ref();

    match parse(text) {
        Command::Start(Some(token)) => {
            let Some(sender) = sender else {
                return Some(INVALID_LINK.into());
            };
            let channel_id = sender.id.to_string();
            Some(link(backend, token, &channel_id, sender.username.as_deref()).await)
        }
        Command::Start(None) => Some(WELCOME.into()),
        Command::Yesterday(None) => Some(YESTERDAY_EMPTY.into()),
        Command::Yesterday(Some(content)) => {
            // Without a sender there is no identity to file the entry under.
            let Some(sender) = sender else {
                return Some(YESTERDAY_EMPTY.into());
            };
            let timestamp = yesterday_noon(sent_at(message));
            Some(
                record(backend, &sender.id.to_string(), content, timestamp, YESTERDAY_RECORDED)
                    .await,
            )
        }
        Command::Unknown => None,
        Command::Text(content) => {
            let sender = sender?;
            if content.is_empty() {
                return None;
            }
            Some(record(backend, &sender.id.to_string(), content, sent_at(message), ENTRY_RECORDED).await)
        }
    }
}

/// Telegram's send time, falling back to now for an out-of-range value.
fn sent_at(message: &Message) -> DateTime<Utc> {
    DateTime::from_timestamp(message.date, 0).unwrap_or_else(Utc::now)
}

async fn link(
    backend: &DaylogClient,
    token: &str,
    channel_id: &str,
    username: Option<&str>,
) -> String {
    match backend.link_telegram(token, channel_id, username).await {
        Ok(user_id) => {
            info!("Telegram identity {} linked to user {}", channel_id, user_id);
            LINKED.into()
        }
        Err(BackendError::Status { message, .. }) => format!("Failed to link account: {}", message),
        Err(e) => {
            error!("Error linking account: {:#}", e);
            GENERIC_ERROR.into()
        }
    }
}

async fn record(
    backend: &DaylogClient,
    channel_id: &str,
    content: &str,
    timestamp: DateTime<Utc>,
    success: &str,
) -> String {
    let user_id = match backend.find_user(channel_id).await {
        Ok(user_id) => user_id,
        Err(e) if e.is_not_found() => return NOT_LINKED.into(),
        Err(e) => {
            error!("Error looking up Telegram identity {}: {:#}", channel_id, e);
            return GENERIC_ERROR.into();
        }
    };

    match backend.create_entry(user_id, content, Some(timestamp)).await {
        Ok(entry) => {
            info!("Entry {} recorded for user {}", entry.id, user_id);
            success.into()
        }
        Err(BackendError::Status { status, message }) => {
            warn!("Server refused entry for user {} ({}): {}", user_id, status, message);
            ENTRY_FAILED.into()
        }
        Err(e) => {
            error!("Error creating entry: {:#}", e);
            GENERIC_ERROR.into()
        }
    }
}
