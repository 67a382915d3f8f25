use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub bot_api_key: Option<String>,
    pub telegram_bot_name: Option<String>,
    pub token_sweep_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = non_empty("DAYLOG_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DAYLOG_JWT_SECRET is unset or still a placeholder");
        }

        let port = non_empty("DAYLOG_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("DAYLOG_PORT must be a port number")?;

        let token_sweep_secs = match non_empty("DAYLOG_TOKEN_SWEEP_SECS") {
            Some(v) => v.parse().context("DAYLOG_TOKEN_SWEEP_SECS must be a number of seconds")?,
            None => 300,
        };
        if token_sweep_secs == 0 {
            bail!("DAYLOG_TOKEN_SWEEP_SECS must be greater than zero");
        }

        Ok(Self {
            host: non_empty("DAYLOG_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: non_empty("DAYLOG_DB_PATH").unwrap_or_else(|| "daylog.db".into()).into(),
            jwt_secret,
            bot_api_key: non_empty("DAYLOG_BOT_API_KEY"),
            telegram_bot_name: non_empty("DAYLOG_TELEGRAM_BOT_NAME"),
            token_sweep_secs,
        })
    }
}
