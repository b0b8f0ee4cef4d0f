use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use water_client::domain::User;

use super::AppState;
use crate::activity;
use crate::auth::{self, AuthUser};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: User,
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("invalid email or password".to_string())
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let email = req.email.trim();
    let user = match state.store.user_by_email(email).await? {
        Some(user) if user.active => user,
        Some(_) => {
            tracing::info!(action = "login_inactive_user", user = %email);
            return Err(invalid_credentials());
        }
        None => return Err(invalid_credentials()),
    };

    if !auth::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(action = "login_bad_password", user = %email);
        return Err(invalid_credentials());
    }

    let (token, expires_at) = state.tokens.issue(&user)?;
    activity::record(state.store.as_ref(), Some(user.id), "login", "user", Some(user.id), None).await;
    tracing::info!(action = "login", user_id = %user.id);

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>> {
    let user = state.store.user(auth.id).await?.ok_or(AppError::NotFound("user"))?;
    Ok(Json(user))
}
