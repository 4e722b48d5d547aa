use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::catalog::{self, ToolFields};
use crate::db::models::Tool;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, MaybeUser};
use crate::state::AppState;
use crate::validate;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CatalogQuery {
    pub all: bool,
}

impl CatalogQuery {
    /// Inactive entries are only listed for admins who ask for them.
    pub fn include_inactive(&self, viewer: &MaybeUser) -> bool {
        self.all && viewer.0.as_ref().is_some_and(|u| u.is_admin())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ToolRequest {
    fn into_fields(self) -> AppResult<ToolFields> {
        Ok(ToolFields {
            name: validate::required(&self.name, "Name")?,
            description: self.description.trim().to_string(),
            url: validate::web_url(&self.url, "Tool URL")?,
            category: self.category.filter(|c| !c.trim().is_empty()),
            image_url: self
                .image_url
                .map(|u| validate::link_target(&u, "Image URL"))
                .transpose()?,
            is_active: self.is_active,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tools", get(list).post(create))
        .route("/api/tools/{id}", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<Tool>>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::list_tools(&conn, query.include_inactive(&viewer))?))
}

async fn show(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Tool>> {
    let conn = state.db.get()?;
    let tool = catalog::get_tool(&conn, &id)?;
    let is_admin = viewer.0.as_ref().is_some_and(|u| u.is_admin());
    if !tool.is_active && !is_admin {
        return Err(AppError::NotFound);
    }
    Ok(Json(tool))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<ToolRequest>,
) -> AppResult<(StatusCode, Json<Tool>)> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    let tool = catalog::insert_tool(&conn, &fields)?;

    tracing::info!(admin = %admin.username, tool = %tool.name, "Tool created");
    Ok((StatusCode::CREATED, Json(tool)))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<ToolRequest>,
) -> AppResult<Json<Tool>> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    Ok(Json(catalog::update_tool(&conn, &id, &fields)?))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    catalog::delete_tool(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
