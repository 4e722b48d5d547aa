use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::settings::{self, FeatureFlags};
use crate::error::AppResult;
use crate::extractors::AdminUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdateSettingsRequest {
    pub flags: BTreeMap<String, bool>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> AppResult<Json<FeatureFlags>> {
    let conn = state.db.get()?;
    Ok(Json(settings::load(&conn)?))
}

async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<UpdateSettingsRequest>,
) -> AppResult<Json<FeatureFlags>> {
    let conn = state.db.get()?;
    let merged = settings::load(&conn)?.merge(&body.flags)?;
    let saved = settings::save(&conn, &merged)?;

    tracing::info!(admin = %admin.username, ?saved, "Feature flags updated");
    Ok(Json(saved))
}
