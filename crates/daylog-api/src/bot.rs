//! Internal routes called by the Telegram relay. All of them sit behind
//! `require_bot_key`.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use daylog_types::api::{BotCreateEntryRequest, EntryResponse, LinkTelegramRequest, UserIdResponse};

use crate::entries::ingest_entry;
use crate::linking;
use crate::{ApiError, ApiJson, ApiPath, AppState, blocking};

/// POST /api/bot/link-telegram
pub async fn link_telegram(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LinkTelegramRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.token.trim().is_empty() || req.channel_id.trim().is_empty() {
        return Err(ApiError::Validation("Missing required fields".into()));
    }

    let user_id = blocking(&state, move |state| {
        let username = req
            .channel_username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        Ok(linking::resolve_link(
            &state.db,
            req.token.trim(),
            req.channel_id.trim(),
            username,
            state.clock.now(),
        )?)
    })
    .await?;

    Ok(Json(UserIdResponse { user_id }))
}

/// GET /api/bot/user/{channel_id}
pub async fn user_by_channel(
    State(state): State<AppState>,
    ApiPath(channel_id): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = blocking(&state, move |state| {
        linking::find_user_by_channel_id(&state.db, &channel_id)
    })
    .await?;

    Ok(Json(UserIdResponse { user_id }))
}

/// POST /api/bot/entries
pub async fn create_entry(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BotCreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = blocking(&state, move |state| {
        ingest_entry(&state.db, req.user_id, &req.content, req.timestamp)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(EntryResponse { entry })))
}
