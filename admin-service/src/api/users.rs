use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use water_client::domain::{NewUser, User, UserRole};

use super::AppState;
use crate::activity;
use crate::auth::{self, AuthUser};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Staff
}

pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<User>>> {
    auth.require_admin()?;
    Ok(Json(state.store.users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    auth.require_admin()?;

    let email = req.email.trim().to_lowercase();
    auth::validate_email(&email)?;
    auth::validate_password(&req.password)?;
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name is required".to_string()));
    }

    let user = state
        .store
        .create_user(NewUser {
            email,
            full_name: req.full_name,
            password_hash: auth::hash_password(&req.password)?,
            role: req.role,
        })
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("a user with this email already exists".to_string()),
            other => other,
        })?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "user",
        Some(user.id),
        Some(format!("{} ({})", user.email, user.role)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}
