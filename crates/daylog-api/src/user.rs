use axum::{Extension, Json, extract::State, response::IntoResponse};

use daylog_types::api::{Claims, LinkTokenResponse, MeResponse, UpdateTimezoneRequest};

use crate::linking::{self, deep_link};
use crate::{ApiError, ApiJson, AppState, blocking};

/// POST /api/user/generate-telegram-token
pub async fn generate_telegram_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = blocking(&state, move |state| {
        Ok(linking::issue_token(&state.db, claims.sub, state.clock.now())?)
    })
    .await?;

    let deep_link = state
        .telegram_bot_name
        .as_deref()
        .map(|bot| deep_link(bot, &issued.token));

    Ok(Json(LinkTokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        deep_link,
    }))
}

/// GET /api/user/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |state| {
        let row = state
            .db
            .get_user_by_id(&claims.sub.to_string())?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        Ok(row.into_user()?)
    })
    .await?;

    Ok(Json(MeResponse { user }))
}

/// PATCH /api/user/timezone
pub async fn update_timezone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateTimezoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let timezone = req.timezone.trim().to_string();
    if timezone.is_empty() || timezone.len() > 100 {
        return Err(ApiError::Validation("Timezone must be 1-100 characters".into()));
    }

    let user = blocking(&state, move |state| {
        let id = claims.sub.to_string();
        if !state.db.update_timezone(&id, &timezone)? {
            return Err(ApiError::NotFound("User not found".into()));
        }
        let row = state
            .db
            .get_user_by_id(&id)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        Ok(row.into_user()?)
    })
    .await?;

    Ok(Json(MeResponse { user }))
}
