use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram_bot_token: String,
    pub telegram_api_base: String,
    pub bot_api_key: String,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| non_empty(key).ok_or_else(|| anyhow!("{} environment variable is required", key));

        let poll_timeout_secs = match non_empty("TELEGRAM_POLL_TIMEOUT_SECS") {
            Some(v) => v.parse().context("TELEGRAM_POLL_TIMEOUT_SECS must be a number of seconds")?,
            None => 30,
        };

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            bot_api_key: required("DAYLOG_BOT_API_KEY")?,
            telegram_api_base: non_empty("TELEGRAM_API_BASE")
                .unwrap_or_else(|| "https://api.telegram.org".into()),
            api_url: non_empty("DAYLOG_API_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            poll_timeout_secs,
        })
    }
}
