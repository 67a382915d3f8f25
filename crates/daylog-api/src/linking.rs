//! Telegram account linking: issuing short-lived tokens on the web side and
//! resolving them when the relay presents them from a chat.
//!
//! Per-user link status moves `Unlinked -> TokenPending -> Linked`. An expired
//! or superseded token drops the user back to whatever state they were in
//! before it was issued.

use anyhow::Context;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::RngCore;
use tracing::{info, warn};
use uuid::Uuid;

use daylog_db::{Database, LinkResolution};

use crate::ApiError;

pub const LINK_TOKEN_TTL_MINUTES: i64 = 10;

/// Random bytes behind each token, hex-encoded on the wire.
const LINK_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid or expired token")]
    TokenNotFound,

    #[error("Token has expired")]
    TokenExpired,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<LinkError> for ApiError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::TokenNotFound => ApiError::NotFound(e.to_string()),
            LinkError::TokenExpired => ApiError::Expired(e.to_string()),
            LinkError::Store(e) => ApiError::Internal(e),
        }
    }
}

pub fn generate_link_token() -> String {
    let mut bytes = [0u8; LINK_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues a fresh token for `user_id`. Any token issued earlier is gone
/// afterwards.
pub fn issue_token(db: &Database, user_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<IssuedToken> {
    let token = generate_link_token();
    // Storage keeps milliseconds; hand back exactly what was stored.
    let expires_at = (now + Duration::minutes(LINK_TOKEN_TTL_MINUTES)).trunc_subsecs(3);

    db.replace_link_token(&user_id.to_string(), &token, expires_at)?;
    info!("Issued Telegram link token for user {} (expires {})", user_id, expires_at);

    Ok(IssuedToken { token, expires_at })
}

/// Presents a token from the chat side, binding `channel_id` to the token's
/// owner on success. The token is single use: success and expiry both
/// consume it.
pub fn resolve_link(
    db: &Database,
    token: &str,
    channel_id: &str,
    channel_username: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Uuid, LinkError> {
    match db.consume_link_token(token, channel_id, channel_username, now)? {
        LinkResolution::Linked { user_id } => {
            let user_id: Uuid = user_id
                .parse()
                .with_context(|| format!("Corrupt user id '{}' on link token", user_id))?;
            info!("Linked Telegram identity {} to user {}", channel_id, user_id);
            Ok(user_id)
        }
        LinkResolution::Expired => {
            warn!("Expired link token presented by Telegram identity {}", channel_id);
            Err(LinkError::TokenExpired)
        }
        LinkResolution::NotFound => Err(LinkError::TokenNotFound),
    }
}

/// Resolves a bound Telegram identity to its user.
pub fn find_user_by_channel_id(db: &Database, channel_id: &str) -> Result<Uuid, ApiError> {
    let user_id = db
        .find_user_by_channel_id(channel_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let user_id = user_id
        .parse()
        .with_context(|| format!("Corrupt user id '{}'", user_id))?;
    Ok(user_id)
}

pub fn deep_link(bot_name: &str, token: &str) -> String {
    format!("https://t.me/{}?start={}", bot_name.trim_start_matches('@'), token)
}
