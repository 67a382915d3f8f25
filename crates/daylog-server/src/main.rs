mod config;
mod sweep;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use daylog_api::clock::SystemClock;
use daylog_api::{AppState, AppStateInner, build_router};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daylog=debug,daylog_api=debug,daylog_db=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.bot_api_key.is_none() {
        warn!("DAYLOG_BOT_API_KEY is not set; the Telegram relay will be refused");
    }
    if config.telegram_bot_name.is_none() {
        warn!("DAYLOG_TELEGRAM_BOT_NAME is not set; link tokens are issued without deep links");
    }

    // Init database
    let db = daylog_db::Database::open(&config.db_path)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        bot_api_key: config.bot_api_key.clone(),
        telegram_bot_name: config.telegram_bot_name.clone(),
        clock: Arc::new(SystemClock),
    });

    tokio::spawn(sweep::run_token_sweep(state.clone(), config.token_sweep_secs));

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Daylog server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
