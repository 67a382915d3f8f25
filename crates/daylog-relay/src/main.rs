use tracing::info;

use daylog_relay::backend::DaylogClient;
use daylog_relay::config::RelayConfig;
use daylog_relay::relay;
use daylog_relay::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daylog_relay=debug".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let telegram = TelegramClient::new(
        &config.telegram_api_base,
        &config.telegram_bot_token,
        config.poll_timeout_secs,
    )?;
    let backend = DaylogClient::new(&config.api_url, &config.bot_api_key);
    info!("Relaying Telegram messages to {}", config.api_url);

    tokio::select! {
        _ = relay::run(telegram, backend, config.poll_timeout_secs) => {}
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
    }

    Ok(())
}
