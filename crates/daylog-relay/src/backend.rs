use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use uuid::Uuid;

use daylog_types::api::{
    BotCreateEntryRequest, EntryResponse, ErrorBody, LinkTelegramRequest, UserIdResponse,
};
use daylog_types::models::Entry;

pub const BOT_API_KEY_HEADER: &str = "x-bot-api-key";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Client for the server's internal `/api/bot` routes.
#[derive(Clone)]
pub struct DaylogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DaylogClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn link_telegram(
        &self,
        token: &str,
        channel_id: &str,
        channel_username: Option<&str>,
    ) -> Result<Uuid, BackendError> {
        let request = LinkTelegramRequest {
            token: token.to_string(),
            channel_id: channel_id.to_string(),
            channel_username: channel_username.map(str::to_string),
        };
        let response = self
            .http
            .post(format!("{}/api/bot/link-telegram", self.base_url))
            .header(BOT_API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .context("link-telegram request")?;
        let body: UserIdResponse = decode(response).await?;
        Ok(body.user_id)
    }

    pub async fn find_user(&self, channel_id: &str) -> Result<Uuid, BackendError> {
        let response = self
            .http
            .get(format!("{}/api/bot/user/{}", self.base_url, channel_id))
            .header(BOT_API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("user lookup request")?;
        let body: UserIdResponse = decode(response).await?;
        Ok(body.user_id)
    }

    pub async fn create_entry(
        &self,
        user_id: Uuid,
        content: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Entry, BackendError> {
        let request = BotCreateEntryRequest {
            user_id,
            content: content.to_string(),
            timestamp,
        };
        let response = self
            .http
            .post(format!("{}/api/bot/entries", self.base_url))
            .header(BOT_API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .context("create entry request")?;
        let body: EntryResponse = decode(response).await?;
        Ok(body.entry)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        // Fall back to the status text when the body is not our error shape
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());
        return Err(BackendError::Status { status, message });
    }
    let body = response
        .json::<T>()
        .await
        .with_context(|| format!("decode {} response", status))?;
    Ok(body)
}
