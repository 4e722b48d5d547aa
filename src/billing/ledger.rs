//! Balance-changing operations. Each one runs in a single database
//! transaction so the coupon, the user row and the ledger row move together.

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::billing::pricing::{self, Purchase, Quote};
use crate::config::BillingConfig;
use crate::db::models::{Coupon, Plan, Transaction, TransactionKind, User};
use crate::db::transactions::NewTransaction;
use crate::db::{coupons, transactions, users, with_transaction};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub transaction: Transaction,
    pub user: User,
}

fn set_balance(conn: &Connection, user_id: &str, coins: i64, plan: Plan) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET coins = ?2, plan = ?3, updated_at = datetime('now') WHERE id = ?1",
        params![user_id, coins, plan],
    )?;
    Ok(())
}

fn credited(coins: i64, delta: i64) -> AppResult<i64> {
    coins
        .checked_add(delta)
        .ok_or_else(|| AppError::BadRequest("Balance out of range".into()))
}

fn load_coupon(conn: &Connection, code: Option<&str>) -> AppResult<Option<Coupon>> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => coupons::find_by_code(conn, code)?
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Unknown coupon code".into())),
        None => Ok(None),
    }
}

/// Price a purchase without committing anything.
pub fn preview(
    conn: &Connection,
    user_id: &str,
    purchase: Purchase,
    coupon_code: Option<&str>,
    billing: &BillingConfig,
) -> AppResult<Quote> {
    let buyer = users::get(conn, user_id)?;
    let coupon = load_coupon(conn, coupon_code)?;
    pricing::quote(purchase, coupon.as_ref(), &buyer, billing, Utc::now())
}

/// Price and settle a purchase: redeem the coupon, move coins, change plan
/// and write the ledger row.
pub fn checkout(
    conn: &Connection,
    user_id: &str,
    purchase: Purchase,
    coupon_code: Option<&str>,
    billing: &BillingConfig,
) -> AppResult<Receipt> {
    with_transaction(conn, |conn| -> AppResult<Receipt> {
        let buyer = users::get(conn, user_id)?;
        let coupon = load_coupon(conn, coupon_code)?;
        let quote = pricing::quote(purchase, coupon.as_ref(), &buyer, billing, Utc::now())?;

        if let Some(ref coupon) = coupon {
            coupons::record_use(conn, &coupon.id)?;
        }

        let (kind, plan, previous_plan, amount_cents) = match purchase {
            Purchase::Coins { .. } => (TransactionKind::CoinPurchase, None, None, quote.total),
            Purchase::Plan { plan } => (TransactionKind::PlanPurchase, Some(plan), Some(buyer.plan), 0),
        };

        set_balance(
            conn,
            &buyer.id,
            credited(buyer.coins, quote.coins_delta)?,
            plan.unwrap_or(buyer.plan),
        )?;

        let transaction = transactions::insert(
            conn,
            &NewTransaction {
                user_id: buyer.id.clone(),
                kind,
                amount_cents,
                discount: quote.discount,
                coins: quote.coins_delta,
                bonus_coins: quote.bonus_coins,
                coupon_code: quote.coupon_code.clone(),
                plan,
                previous_plan,
                note: None,
            },
        )?;

        tracing::info!(
            user = %buyer.username,
            kind = %kind,
            coins = quote.coins_delta,
            coupon = ?quote.coupon_code,
            "Checkout completed"
        );

        Ok(Receipt {
            transaction,
            user: users::get(conn, &buyer.id)?,
        })
    })
}

/// Credit or debit a user's balance by hand. The balance may not go negative.
pub fn adjust(
    conn: &Connection,
    user_id: &str,
    delta: i64,
    note: Option<String>,
) -> AppResult<Receipt> {
    if delta == 0 {
        return Err(AppError::BadRequest("Adjustment must not be zero".into()));
    }

    with_transaction(conn, |conn| -> AppResult<Receipt> {
        let user = users::get(conn, user_id)?;
        let balance = credited(user.coins, delta)?;
        if balance < 0 {
            return Err(AppError::BadRequest(format!(
                "Adjustment would leave a negative balance ({})",
                balance
            )));
        }

        set_balance(conn, &user.id, balance, user.plan)?;
        let transaction = transactions::insert(
            conn,
            &NewTransaction {
                user_id: user.id.clone(),
                kind: TransactionKind::AdminAdjustment,
                amount_cents: 0,
                discount: 0,
                coins: delta,
                bonus_coins: 0,
                coupon_code: None,
                plan: None,
                previous_plan: None,
                note,
            },
        )?;

        Ok(Receipt {
            transaction,
            user: users::get(conn, &user.id)?,
        })
    })
}

/// Undo a ledger row and delete it. The balance moves back by the row's coin
/// delta (never below zero) and a plan purchase restores the previous plan.
/// Coupon usage stays counted.
pub fn reverse(conn: &Connection, transaction_id: &str) -> AppResult<User> {
    with_transaction(conn, |conn| -> AppResult<User> {
        let tx = transactions::get(conn, transaction_id)?;
        let user = users::get(conn, &tx.user_id)?;

        let balance = user.coins.saturating_sub(tx.coins).max(0);
        let plan = match (tx.kind, tx.previous_plan) {
            (TransactionKind::PlanPurchase, Some(previous)) => previous,
            _ => user.plan,
        };

        set_balance(conn, &user.id, balance, plan)?;
        transactions::delete(conn, &tx.id)?;

        tracing::info!(
            transaction = %tx.id,
            user = %user.username,
            coins = -tx.coins,
            "Transaction reversed"
        );

        users::get(conn, &user.id)
    })
}
