use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::billing::{ledger, Purchase, Quote};
use crate::db::coupons::{self, CouponFields};
use crate::db::models::{Coupon, DiscountType};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::state::AppState;
use crate::validate;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CouponRequest {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub usage_limit: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub purchase: Purchase,
}

impl CouponRequest {
    fn into_fields(self) -> AppResult<CouponFields> {
        let code = validate::coupon_code(&self.code)?;
        if self.value <= 0 {
            return Err(AppError::BadRequest("Coupon value must be positive".into()));
        }
        if self.discount_type == DiscountType::Percentage && self.value > 100 {
            return Err(AppError::BadRequest(
                "Percentage discounts cannot exceed 100".into(),
            ));
        }
        if self.usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(AppError::BadRequest("Usage limit must be positive".into()));
        }

        Ok(CouponFields {
            code,
            discount_type: self.discount_type,
            value: self.value,
            usage_limit: self.usage_limit,
            is_active: self.is_active,
            expires_at: self.expires_at,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/coupons", get(list).post(create))
        .route("/api/coupons/validate", post(validate_code))
        .route("/api/coupons/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Json<Vec<Coupon>>> {
    let conn = state.db.get()?;
    Ok(Json(coupons::list(&conn)?))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<Coupon>> {
    let conn = state.db.get()?;
    Ok(Json(coupons::get(&conn, &id)?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CouponRequest>,
) -> AppResult<(StatusCode, Json<Coupon>)> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    let coupon = coupons::insert(&conn, &fields)?;

    tracing::info!(admin = %admin.username, code = %coupon.code, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<CouponRequest>,
) -> AppResult<Json<Coupon>> {
    let fields = body.into_fields()?;
    let conn = state.db.get()?;
    Ok(Json(coupons::update(&conn, &id, &fields)?))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    coupons::delete(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Quote what a checkout with this coupon would cost, without redeeming it.
async fn validate_code(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<ValidateRequest>,
) -> AppResult<Json<Quote>> {
    if body.code.trim().is_empty() {
        return Err(AppError::BadRequest("Coupon code is required".into()));
    }
    let conn = state.db.get()?;
    let quote = ledger::preview(
        &conn,
        &current.user.id,
        body.purchase,
        Some(body.code.as_str()),
        &state.config.billing,
    )?;
    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(discount_type: DiscountType, value: i64) -> CouponRequest {
        CouponRequest {
            code: " spring-10 ".into(),
            discount_type,
            value,
            usage_limit: None,
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn codes_are_normalized() {
        let fields = request(DiscountType::Fixed, 50).into_fields().unwrap();
        assert_eq!(fields.code, "SPRING-10");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(request(DiscountType::Percentage, 101).into_fields().is_err());
        assert!(request(DiscountType::Bonus, 0).into_fields().is_err());

        let mut limited = request(DiscountType::Fixed, 5);
        limited.usage_limit = Some(0);
        assert!(limited.into_fields().is_err());
    }
}
