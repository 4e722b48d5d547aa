use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::Offer;
use crate::db::offers::{self, OfferFields};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::validate;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct OfferRequest {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub price_label: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i64,
}

impl OfferRequest {
    fn into_fields(self) -> AppResult<OfferFields> {
        Ok(OfferFields {
            title: validate::required(&self.title, "Title")?,
            description: self.description,
            url: validate::web_url(&self.url, "Offer URL")?,
            image_url: self
                .image_url
                .map(|u| validate::link_target(&u, "Image URL"))
                .transpose()?,
            price_label: self.price_label,
            is_active: self.is_active,
            position: self.position,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/offers", get(list).post(create))
        .route("/api/offers/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Vec<Offer>>> {
    let conn = state.db.get()?;
    Ok(Json(offers::list_for_user(&conn, &current.user.id, false)?))
}

async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Offer>> {
    let conn = state.db.get()?;
    Ok(Json(offers::get_owned(&conn, &current.user.id, &id)?))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<OfferRequest>,
) -> AppResult<(StatusCode, Json<Offer>)> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    let offer = offers::insert(&conn, &current.user.id, &fields)?;
    Ok((StatusCode::CREATED, Json(offer)))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<OfferRequest>,
) -> AppResult<Json<Offer>> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    Ok(Json(offers::update(&conn, &current.user.id, &id, &fields)?))
}

async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    offers::delete(&conn, &current.user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
