//! Pure pricing rules for checkout. Nothing in here touches the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BillingConfig;
use crate::db::models::{Coupon, DiscountType, Plan, User};
use crate::error::{AppError, AppResult};

pub const MAX_COINS_PER_PURCHASE: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Purchase {
    /// Buy coins with money.
    Coins { coins: i64 },
    /// Upgrade the account plan, paid in coins.
    Plan { plan: Plan },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Cents,
    Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub purchase: Purchase,
    /// What `base`, `discount` and `total` are measured in.
    pub unit: Unit,
    pub base: i64,
    pub discount: i64,
    pub total: i64,
    pub bonus_coins: i64,
    /// Signed change to the buyer's coin balance.
    pub coins_delta: i64,
    pub coupon_code: Option<String>,
}

/// Why a coupon cannot be redeemed right now, if it cannot.
pub fn check_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> AppResult<()> {
    if !coupon.is_active {
        return Err(AppError::BadRequest("Coupon is not active".into()));
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(AppError::BadRequest("Coupon usage limit reached".into()));
        }
    }
    if let Some(ref raw) = coupon.expires_at {
        let expires_at = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| AppError::Internal(format!("bad coupon expiry {}: {}", raw, e)))?;
        if expires_at <= now {
            return Err(AppError::BadRequest("Coupon has expired".into()));
        }
    }
    Ok(())
}

fn discount_on(base: i64, coupon: &Coupon) -> i64 {
    match coupon.discount_type {
        DiscountType::Percentage => base * coupon.value.clamp(0, 100) / 100,
        DiscountType::Fixed => coupon.value.min(base).max(0),
        DiscountType::Bonus => 0,
    }
}

pub fn plan_price(plan: Plan, billing: &BillingConfig) -> Option<i64> {
    match plan {
        Plan::Free => None,
        Plan::Pro => Some(billing.pro_coins),
        Plan::Business => Some(billing.business_coins),
    }
}

/// Price `purchase` for `buyer`, applying `coupon` when given.
pub fn quote(
    purchase: Purchase,
    coupon: Option<&Coupon>,
    buyer: &User,
    billing: &BillingConfig,
    now: DateTime<Utc>,
) -> AppResult<Quote> {
    if let Some(coupon) = coupon {
        check_redeemable(coupon, now)?;
    }
    let coupon_code = coupon.map(|c| c.code.clone());

    match purchase {
        Purchase::Coins { coins } => {
            if !(1..=MAX_COINS_PER_PURCHASE).contains(&coins) {
                return Err(AppError::BadRequest(format!(
                    "Coin amount must be between 1 and {}",
                    MAX_COINS_PER_PURCHASE
                )));
            }

            let base = coins * billing.coin_price_cents;
            let discount = coupon.map_or(0, |c| discount_on(base, c));
            let bonus_coins = coupon
                .filter(|c| c.discount_type == DiscountType::Bonus)
                .map_or(0, |c| c.value);

            Ok(Quote {
                purchase,
                unit: Unit::Cents,
                base,
                discount,
                total: base - discount,
                bonus_coins,
                coins_delta: coins.saturating_add(bonus_coins),
                coupon_code,
            })
        }
        Purchase::Plan { plan } => {
            let base = plan_price(plan, billing)
                .ok_or_else(|| AppError::BadRequest("The free plan cannot be purchased".into()))?;
            if buyer.plan == plan {
                return Err(AppError::BadRequest(format!(
                    "Already on the {} plan",
                    plan
                )));
            }
            if coupon.is_some_and(|c| c.discount_type == DiscountType::Bonus) {
                return Err(AppError::BadRequest(
                    "Bonus coupons only apply to coin purchases".into(),
                ));
            }

            let discount = coupon.map_or(0, |c| discount_on(base, c));
            let total = base - discount;
            if buyer.coins < total {
                return Err(AppError::BadRequest(format!(
                    "Insufficient coins: {} needed, {} available",
                    total, buyer.coins
                )));
            }

            Ok(Quote {
                purchase,
                unit: Unit::Coins,
                base,
                discount,
                total,
                bonus_coins: 0,
                coins_delta: -total,
                coupon_code,
            })
        }
    }
}
