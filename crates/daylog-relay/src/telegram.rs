use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix seconds when the message was sent.
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl TelegramClient {
    /// `poll_timeout_secs` is the long-poll window; the HTTP timeout is set
    /// a little above it.
    pub fn new(api_base: &str, bot_token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("build telegram http client")?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", api_base.trim().trim_end_matches('/'), bot_token),
        })
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let response = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[("offset", offset.to_string()), ("timeout", timeout_secs.to_string())])
            .send()
            .await
            .context("telegram getUpdates request")?;
        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .context("decode telegram getUpdates response")?;
        unwrap_response(body, "getUpdates")
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .context("telegram sendMessage request")?;
        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .context("decode telegram sendMessage response")?;
        unwrap_response(body, "sendMessage").map(|_| ())
    }
}

fn unwrap_response<T>(body: ApiResponse<T>, method: &str) -> Result<T> {
    if !body.ok {
        bail!(
            "telegram {} failed: {}",
            method,
            body.description.unwrap_or_else(|| "no description".into())
        );
    }
    body.result
        .with_context(|| format!("telegram {} response missing result", method))
}
