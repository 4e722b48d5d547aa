//! Self-service account management for the signed-in user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::{password, session};
use crate::db::models::{User, UsernameChange};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::validate;

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", delete(delete_account))
        .route("/api/users/me/email", put(update_email))
        .route("/api/users/me/username", put(update_username))
        .route("/api/users/me/username-history", get(username_history))
        .route("/api/users/me/password", put(update_password))
}

async fn update_email(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<EmailRequest>,
) -> AppResult<Json<User>> {
    let email = validate::email(&body.email)?;
    let conn = state.db.get()?;
    Ok(Json(users::update_email(&conn, &current.user.id, &email)?))
}

async fn update_username(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<UsernameRequest>,
) -> AppResult<Json<User>> {
    let username = validate::username(&body.username)?;
    let conn = state.db.get()?;
    let user = users::change_username(&conn, &current.user.id, &username)?;

    tracing::info!(from = %current.user.username, to = %user.username, "Username changed");
    Ok(Json(user))
}

async fn username_history(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<UsernameChange>>> {
    let conn = state.db.get()?;
    Ok(Json(users::username_history(&conn, &current.user.id)?))
}

/// Change the password after re-checking the current one. Every other
/// session of the account is signed out.
async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<PasswordRequest>,
) -> AppResult<StatusCode> {
    if !password::verify(&body.current_password, &current.user.password_hash) {
        return Err(AppError::Unauthorized);
    }
    validate::password(&body.new_password, state.config.auth.min_password_len)?;

    let hash = password::hash(&body.new_password, state.config.auth.bcrypt_cost)?;
    let conn = state.db.get()?;
    users::update_password_hash(&conn, &current.user.id, &hash)?;
    let revoked = session::delete_user_sessions(&conn, &current.user.id, Some(current.token.as_str()))?;

    tracing::info!(user = %current.user.username, revoked, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    users::delete(&conn, &current.user.id)?;

    tracing::info!(user = %current.user.username, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
