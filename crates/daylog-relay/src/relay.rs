use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::DaylogClient;
use crate::handler::handle_message;
use crate::telegram::{TelegramClient, Update};

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polls Telegram forever, handling updates strictly in arrival order so a
/// chat's entries are created in the order they were sent.
pub async fn run(telegram: TelegramClient, backend: DaylogClient, poll_timeout_secs: u64) {
    let mut offset: i64 = 0;
    info!("Telegram relay started");

    loop {
        let updates = match telegram.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling error: {:#}", e);
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                continue;
            }
        };

        offset = next_offset(offset, &updates);
        for update in updates {
            process_update(&telegram, &backend, update).await;
        }
    }
}

async fn process_update(telegram: &TelegramClient, backend: &DaylogClient, update: Update) {
    let Some(message) = update.message else {
        debug!("Skipping non-message update {}", update.update_id);
        return;
    };

    if let Some(reply) = handle_message(&message, backend).await {
        if let Err(e) = telegram.send_message(message.chat.id, &reply).await {
            warn!("Failed to reply in chat {}: {:#}", message.chat.id, e);
        }
    }
}

/// Telegram confirms updates by asking for the id after the highest one seen.
fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id.saturating_add(1))
        .fold(current, i64::max)
}
