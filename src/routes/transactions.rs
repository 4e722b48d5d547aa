use axum::extract::{Path, Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;

use crate::billing::ledger;
use crate::db::models::{Transaction, User};
use crate::db::transactions;
use crate::error::AppResult;
use crate::extractors::{AdminUser, CurrentUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/transactions", get(list_own))
        .route("/api/admin/transactions", get(list_all))
        .route("/api/admin/transactions/{id}", delete(reverse))
}

async fn list_own(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Transaction>>> {
    let conn = state.db.get()?;
    Ok(Json(transactions::list(&conn, Some(current.user.id.as_str()))?))
}

async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<Transaction>>> {
    let conn = state.db.get()?;
    Ok(Json(transactions::list(&conn, filter.user_id.as_deref())?))
}

/// Reverse a ledger row and return the affected user's new state.
async fn reverse(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let user = ledger::reverse(&conn, &id)?;

    tracing::info!(admin = %admin.username, transaction = %id, "Reversal requested");
    Ok(Json(user))
}
