use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use daylog_db::Database;
use daylog_types::api::{
    Claims, CreateEntryRequest, EntriesResponse, EntryRangeQuery, EntryResponse, SuccessResponse,
    UpdateEntryRequest,
};
use daylog_types::models::Entry;

use crate::{ApiError, ApiJson, ApiPath, ApiQuery, AppState, blocking};

/// Creates an entry for `user_id`. Content is trimmed and must not be empty.
/// A supplied timestamp is kept as the authoring time; without one the store
/// stamps the entry with the current time.
pub fn ingest_entry(
    db: &Database,
    user_id: Uuid,
    content: &str,
    timestamp: Option<DateTime<Utc>>,
) -> Result<Entry, ApiError> {
    let content = validated_content(content)?;

    let entry_id = Uuid::new_v4();
    let row = db
        .insert_entry(&entry_id.to_string(), &user_id.to_string(), content, timestamp)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    debug!("Entry {} created for user {}", entry_id, user_id);
    Ok(row.into_entry()?)
}

/// Ids are only ever handed out as UUIDs, so anything else names no entry.
fn parse_entry_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Entry not found".into()))
}

fn validated_content(content: &str) -> Result<&str, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }
    Ok(content)
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<EntryRangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // A half-open range is ignored, like a missing one.
    let range = match (query.start, query.end) {
        (Some(start), Some(end)) if start > end => {
            return Err(ApiError::Validation("start must not be after end".into()));
        }
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    let entries = blocking(&state, move |state| {
        let rows = state.db.list_entries(&claims.sub.to_string(), range)?;
        let entries = rows
            .into_iter()
            .map(|row| row.into_entry())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(entries)
    })
    .await?;

    Ok(Json(EntriesResponse { entries }))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = blocking(&state, move |state| {
        ingest_entry(&state.db, claims.sub, &req.content, req.timestamp)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(EntryResponse { entry })))
}

pub async fn update_entry(
    State(state): State<AppState>,
    ApiPath(entry_id): ApiPath<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry_id = parse_entry_id(&entry_id)?;
    let entry = blocking(&state, move |state| {
        let content = validated_content(&req.content)?;
        let row = state
            .db
            .update_entry_content(&entry_id.to_string(), &claims.sub.to_string(), content)?
            .ok_or_else(|| ApiError::NotFound("Entry not found".into()))?;
        Ok(row.into_entry()?)
    })
    .await?;

    Ok(Json(EntryResponse { entry }))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    ApiPath(entry_id): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let entry_id = parse_entry_id(&entry_id)?;
    blocking(&state, move |state| {
        if !state.db.delete_entry(&entry_id.to_string(), &claims.sub.to_string())? {
            return Err(ApiError::NotFound("Entry not found".into()));
        }
        Ok(())
    })
    .await?;

    Ok(Json(SuccessResponse { success: true }))
}
