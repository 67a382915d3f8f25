use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use daylog_db::Database;
use daylog_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::clock::Clock;
use crate::{ApiError, ApiJson, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Shared key the relay presents in `x-bot-api-key`.
    pub bot_api_key: Option<String>,
    /// Telegram bot username used to build `t.me` deep links.
    pub telegram_bot_name: Option<String>,
    pub clock: Arc<dyn Clock>,
}

const SESSION_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    // Validate input
    if name.is_empty() || name.chars().count() > 255 {
        return Err(ApiError::Validation("Name must be 1-255 characters".into()));
    }
    if !email.contains('@') || email.len() > 255 {
        return Err(ApiError::Validation("A valid email is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters".into()));
    }

    let (user_id, token) = blocking(&state, move |state| {
        if state.db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".into()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user_id = Uuid::new_v4();
        state
            .db
            .create_user(&user_id.to_string(), &name, &email, &password_hash)?;

        let token = create_token(&state.jwt_secret, user_id, &email)?;
        info!("Registered user {}", user_id);
        Ok((user_id, token))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let response = blocking(&state, move |state| {
        let user = state
            .db
            .get_user_by_email(&email)?
            .ok_or(ApiError::Unauthorized)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("corrupt password hash for {}: {}", user.id, e))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        let user = user.into_user()?;
        let token = create_token(&state.jwt_secret, user.id, &user.email)?;

        Ok(LoginResponse {
            user_id: user.id,
            name: user.name,
            token,
        })
    })
    .await?;

    Ok(Json(response))
}

pub(crate) fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
