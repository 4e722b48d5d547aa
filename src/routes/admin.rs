use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::session;
use crate::billing::{ledger, Receipt};
use crate::db::models::{Plan, Role, User};
use crate::db::users::{self, AdminChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchUserRequest {
    pub role: Option<Role>,
    pub plan: Option<Plan>,
    pub is_blocked: Option<bool>,
}

#[derive(Deserialize)]
pub struct AdjustCoinsRequest {
    pub delta: i64,
    pub note: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/{id}",
            get(get_user).patch(patch_user).delete(delete_user),
        )
        .route("/api/admin/users/{id}/coins", post(adjust_coins))
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<User>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list(&conn, query.search.as_deref())?))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(users::get(&conn, &id)?))
}

async fn patch_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<PatchUserRequest>,
) -> AppResult<Json<User>> {
    if id == admin.id {
        if body.is_blocked == Some(true) {
            return Err(AppError::BadRequest("You cannot block yourself".into()));
        }
        if body.role == Some(Role::User) {
            return Err(AppError::BadRequest("You cannot remove your own admin role".into()));
        }
    }

    let conn = state.db.get()?;
    let user = users::apply_admin_changes(
        &conn,
        &id,
        &AdminChanges {
            role: body.role,
            plan: body.plan,
            is_blocked: body.is_blocked,
        },
    )?;

    if body.is_blocked == Some(true) {
        let revoked = session::delete_user_sessions(&conn, &user.id, None)?;
        tracing::info!(admin = %admin.username, user = %user.username, revoked, "User blocked");
    }

    Ok(Json(user))
}

async fn adjust_coins(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<AdjustCoinsRequest>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    let conn = state.db.get()?;
    let receipt = ledger::adjust(&conn, &id, body.delta, body.note)?;

    tracing::info!(
        admin = %admin.username,
        user = %receipt.user.username,
        delta = body.delta,
        "Coins adjusted"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Delete your own account from account settings".into(),
        ));
    }

    let conn = state.db.get()?;
    users::delete(&conn, &id)?;

    tracing::info!(admin = %admin.username, user = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
