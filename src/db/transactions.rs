use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Plan, Transaction, TransactionKind};
use crate::db::new_id;
use crate::error::{AppError, AppResult};

/// A ledger row before it is written.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub discount: i64,
    pub coins: i64,
    pub bonus_coins: i64,
    pub coupon_code: Option<String>,
    pub plan: Option<Plan>,
    pub previous_plan: Option<Plan>,
    pub note: Option<String>,
}

const TRANSACTION_COLUMNS: &str = "id, user_id, kind, amount_cents, discount, coins, bonus_coins, \
                                   coupon_code, plan, previous_plan, note, created_at";

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        amount_cents: row.get(3)?,
        discount: row.get(4)?,
        coins: row.get(5)?,
        bonus_coins: row.get(6)?,
        coupon_code: row.get(7)?,
        plan: row.get(8)?,
        previous_plan: row.get(9)?,
        note: row.get(10)?,
        created_at: row.get(11)?,
    })
}

pub fn insert(conn: &Connection, tx: &NewTransaction) -> AppResult<Transaction> {
    let id = new_id();
    conn.execute(
        "INSERT INTO transactions (id, user_id, kind, amount_cents, discount, coins, bonus_coins, \
         coupon_code, plan, previous_plan, note) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            id,
            tx.user_id,
            tx.kind,
            tx.amount_cents,
            tx.discount,
            tx.coins,
            tx.bonus_coins,
            tx.coupon_code,
            tx.plan,
            tx.previous_plan,
            tx.note
        ],
    )?;
    get(conn, &id)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = ?1",
        TRANSACTION_COLUMNS
    );
    conn.query_row(&sql, params![id], row_to_transaction)
        .optional()?
        .ok_or(AppError::NotFound)
}

/// Newest first, optionally restricted to one user.
pub fn list(conn: &Connection, user_id: Option<&str>) -> AppResult<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE ?1 IS NULL OR user_id = ?1 \
         ORDER BY created_at DESC, rowid DESC",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id], row_to_transaction)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
