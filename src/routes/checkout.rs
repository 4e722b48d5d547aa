use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::billing::{ledger, Purchase, Receipt};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub purchase: Purchase,
    pub coupon_code: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/checkout", post(checkout))
}

async fn checkout(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    let conn = state.db.get()?;
    let receipt = ledger::checkout(
        &conn,
        &current.user.id,
        body.purchase,
        body.coupon_code.as_deref(),
        &state.config.billing,
    )?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
