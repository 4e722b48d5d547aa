use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::models::{CustomPage, Profile, Update, User};
use crate::db::{profiles, settings, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::profile::{self, ProfileUpdate, PublicProfile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub body: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profiles/{username}", get(public_profile))
        .route("/api/profiles/{username}/pages/{slug}", get(public_page))
        .route("/api/profile", get(own_profile).put(update_profile))
        .route("/api/profile/pages", post(create_page))
        .route("/api/profile/pages/{slug}", put(replace_page).delete(delete_page))
        .route("/api/profile/updates", post(create_update))
        .route("/api/profile/updates/{id}", delete(delete_update))
}

/// The owner of a public profile. Blocked accounts are hidden.
fn visible_owner(conn: &Connection, username: &str) -> AppResult<User> {
    users::find_by_username(conn, username)?
        .filter(|u| !u.is_blocked)
        .ok_or(AppError::NotFound)
}

async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    let conn = state.db.get()?;
    let owner = visible_owner(&conn, &username)?;
    let flags = settings::load(&conn)?;
    let stored = profiles::get(&conn, &owner.id)?;
    Ok(Json(profile::compose(&conn, &owner, stored, &flags)?))
}

async fn public_page(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
) -> AppResult<Json<CustomPage>> {
    let conn = state.db.get()?;
    if !settings::load(&conn)?.custom_pages {
        return Err(AppError::NotFound);
    }
    let owner = visible_owner(&conn, &username)?;
    let stored = profiles::get(&conn, &owner.id)?;

    stored
        .custom_pages
        .into_iter()
        .find(|p| p.slug == slug && p.published)
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn own_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Profile>> {
    let conn = state.db.get()?;
    Ok(Json(profiles::get(&conn, &current.user.id)?))
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    let conn = state.db.get()?;
    let (saved, ()) = profile::edit(&conn, &current.user.id, |conn, p| body.apply(conn, p))?;
    Ok(Json(saved))
}

async fn create_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(page): Json<CustomPage>,
) -> AppResult<(StatusCode, Json<CustomPage>)> {
    let conn = state.db.get()?;
    let (_, page) = profile::edit(&conn, &current.user.id, |_, p| profile::add_page(p, page))?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn replace_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Json(page): Json<CustomPage>,
) -> AppResult<Json<CustomPage>> {
    let conn = state.db.get()?;
    let (_, page) = profile::edit(&conn, &current.user.id, |_, p| {
        profile::replace_page(p, &slug, page)
    })?;
    Ok(Json(page))
}

async fn delete_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    profile::edit(&conn, &current.user.id, |_, p| profile::remove_page(p, &slug))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<UpdateRequest>,
) -> AppResult<(StatusCode, Json<Update>)> {
    let conn = state.db.get()?;
    let (_, update) = profile::edit(&conn, &current.user.id, |_, p| {
        profile::post_update(p, &body.body)
    })?;
    Ok((StatusCode::CREATED, Json(update)))
}

async fn delete_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    profile::edit(&conn, &current.user.id, |_, p| profile::remove_update(p, &id))?;
    Ok(StatusCode::NO_CONTENT)
}
