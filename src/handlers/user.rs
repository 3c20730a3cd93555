use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::instrument;

use crate::auth::jwt::sign_token;
use crate::dtos::user::{LoginRequest, LoginResponse};
use crate::error::AppError;
use crate::state::AppState;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    is_active: bool,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, is_active, created_at
         FROM users WHERE username = $1",
    )
    .bind(req.username.trim())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Invalid username or password"))?;

    if !user.is_active {
        return Err(AppError::unauthorized("Account is disabled"));
    }

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !valid {
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT_SECRET is not configured"))?;
    let token = sign_token(user.id, &user.role, &user.username, &secret)?;

    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db_pool)
        .await?;

    tracing::info!(user = %user.username, "login");
    state
        .event_hub
        .publish("user.logged_in", json!({ "user_id": user.id }));

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}
