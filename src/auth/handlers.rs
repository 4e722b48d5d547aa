use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{password, session};
use crate::db::models::User;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::validate;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Handlers --

/// Create an account and sign it in. The very first account becomes an admin.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let username = validate::username(&body.username)?;
    let email = validate::email(&body.email)?;
    validate::password(&body.password, state.config.auth.min_password_len)?;

    let hash = password::hash(&body.password, state.config.auth.bcrypt_cost)?;

    let conn = state.db.get()?;
    let user = users::register(&conn, &username, &email, &hash)?;
    let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;

    tracing::info!(user = %user.username, role = %user.role, "Registered new user");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let conn = state.db.get()?;

    let user = users::find_by_login(&conn, &body.identifier)?.ok_or(AppError::Unauthorized)?;
    if !password::verify(&body.password, &user.password_hash) {
        tracing::debug!(identifier = %body.identifier, "Rejected login");
        return Err(AppError::Unauthorized);
    }
    if user.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".into()));
    }

    let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;
    tracing::info!(user = %user.username, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    session::delete_session(&conn, &current.token)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}
