use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::catalog::{self, PromptFields};
use crate::db::models::Prompt;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, MaybeUser};
use crate::routes::tools::CatalogQuery;
use crate::state::AppState;
use crate::validate;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct PromptRequest {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PromptRequest {
    fn into_fields(self) -> AppResult<PromptFields> {
        Ok(PromptFields {
            title: validate::required(&self.title, "Title")?,
            body: validate::required(&self.body, "Body")?,
            category: self.category.filter(|c| !c.trim().is_empty()),
            is_active: self.is_active,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/prompts", get(list).post(create))
        .route("/api/prompts/{id}", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<Prompt>>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::list_prompts(&conn, query.include_inactive(&viewer))?))
}

async fn show(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Prompt>> {
    let conn = state.db.get()?;
    let prompt = catalog::get_prompt(&conn, &id)?;
    let is_admin = viewer.0.as_ref().is_some_and(|u| u.is_admin());
    if !prompt.is_active && !is_admin {
        return Err(AppError::NotFound);
    }
    Ok(Json(prompt))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<PromptRequest>,
) -> AppResult<(StatusCode, Json<Prompt>)> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    let prompt = catalog::insert_prompt(&conn, &fields)?;

    tracing::info!(admin = %admin.username, prompt = %prompt.title, "Prompt created");
    Ok((StatusCode::CREATED, Json(prompt)))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<PromptRequest>,
) -> AppResult<Json<Prompt>> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    Ok(Json(catalog::update_prompt(&conn, &id, &fields)?))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    catalog::delete_prompt(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
