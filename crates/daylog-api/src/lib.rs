//! HTTP surface of Daylog: session auth, the web journal routes and the
//! internal routes the Telegram relay calls.

pub mod auth;
pub mod bot;
pub mod clock;
pub mod entries;
pub mod error;
pub mod linking;
pub mod middleware;
pub mod user;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// JSON body extractor whose rejections render as [`ApiError::Validation`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with JSON error bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor with JSON error bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Assembles every route. Layers that only matter for a real listener
/// (CORS, tracing) are added by the server binary.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let web_routes = Router::new()
        .route("/api/user/me", get(user::me))
        .route("/api/user/timezone", patch(user::update_timezone))
        .route("/api/user/generate-telegram-token", post(user::generate_telegram_token))
        .route("/api/entries", get(entries::list_entries).post(entries::create_entry))
        .route(
            "/api/entries/{entry_id}",
            patch(entries::update_entry).delete(entries::delete_entry),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let bot_routes = Router::new()
        .route("/api/bot/link-telegram", post(bot::link_telegram))
        .route("/api/bot/user/{channel_id}", get(bot::user_by_channel))
        .route("/api/bot/entries", post(bot::create_entry))
        .layer(from_fn_with_state(state.clone(), middleware::require_bot_key));

    Router::new()
        .merge(public_routes)
        .merge(web_routes)
        .merge(bot_routes)
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Runs blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&*state)).await?
}
