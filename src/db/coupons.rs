use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Coupon, DiscountType};
use crate::db::new_id;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CouponFields {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub usage_limit: Option<i64>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

const COUPON_COLUMNS: &str =
    "id, code, discount_type, value, usage_limit, used_count, is_active, expires_at, created_at";

fn row_to_coupon(row: &Row<'_>) -> rusqlite::Result<Coupon> {
    Ok(Coupon {
        id: row.get(0)?,
        code: row.get(1)?,
        discount_type: row.get(2)?,
        value: row.get(3)?,
        usage_limit: row.get(4)?,
        used_count: row.get(5)?,
        is_active: row.get(6)?,
        expires_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub fn list(conn: &Connection) -> AppResult<Vec<Coupon>> {
    let sql = format!(
        "SELECT {} FROM coupons ORDER BY created_at DESC, rowid DESC",
        COUPON_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let coupons = stmt
        .query_map([], row_to_coupon)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(coupons)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Coupon> {
    let sql = format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLUMNS);
    conn.query_row(&sql, params![id], row_to_coupon)
        .optional()?
        .ok_or(AppError::NotFound)
}

pub fn find_by_code(conn: &Connection, code: &str) -> AppResult<Option<Coupon>> {
    let sql = format!("SELECT {} FROM coupons WHERE code = ?1", COUPON_COLUMNS);
    Ok(conn
        .query_row(&sql, params![code.trim().to_uppercase()], row_to_coupon)
        .optional()?)
}

pub fn insert(conn: &Connection, fields: &CouponFields) -> AppResult<Coupon> {
    let id = new_id();
    conn.execute(
        "INSERT INTO coupons (id, code, discount_type, value, usage_limit, is_active, expires_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            fields.code,
            fields.discount_type,
            fields.value,
            fields.usage_limit,
            fields.is_active,
            fields.expires_at.map(|t| t.to_rfc3339())
        ],
    )?;
    get(conn, &id)
}

/// Replace the editable fields. `used_count` is never touched here.
pub fn update(conn: &Connection, id: &str, fields: &CouponFields) -> AppResult<Coupon> {
    let rows = conn.execute(
        "UPDATE coupons SET code = ?2, discount_type = ?3, value = ?4, usage_limit = ?5, \
         is_active = ?6, expires_at = ?7 WHERE id = ?1",
        params![
            id,
            fields.code,
            fields.discount_type,
            fields.value,
            fields.usage_limit,
            fields.is_active,
            fields.expires_at.map(|t| t.to_rfc3339())
        ],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM coupons WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Count one redemption, deactivating the coupon once it reaches its limit.
pub fn record_use(conn: &Connection, id: &str) -> AppResult<Coupon> {
    let rows = conn.execute(
        "UPDATE coupons SET used_count = used_count + 1, \
         is_active = CASE WHEN usage_limit IS NOT NULL AND used_count + 1 >= usage_limit \
                          THEN 0 ELSE is_active END \
         WHERE id = ?1",
        params![id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    fn fields(code: &str, limit: Option<i64>) -> CouponFields {
        CouponFields {
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            value: 20,
            usage_limit: limit,
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn insert_persists_fields() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let expires = "2030-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let coupon = insert(
            &conn,
            &CouponFields {
                expires_at: Some(expires),
                ..fields("SPRING20", Some(5))
            },
        )
        .unwrap();
        assert_eq!(coupon.code, "SPRING20");
        assert_eq!(coupon.discount_type, DiscountType::Percentage);
        assert_eq!(coupon.value, 20);
        assert_eq!(coupon.usage_limit, Some(5));
        assert_eq!(coupon.used_count, 0);
        let stored = coupon.expires_at.unwrap().parse::<DateTime<Utc>>().unwrap();
        assert_eq!(stored, expires);
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, &fields("ONCE", None)).unwrap();
        assert!(matches!(
            insert(&conn, &fields("ONCE", None)),
            Err(AppError::Database(_))
        ));
    }

    #[test]
    fn record_use_counts_and_deactivates_at_limit() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let coupon = insert(&conn, &fields("TWICE", Some(2))).unwrap();

        let after_one = record_use(&conn, &coupon.id).unwrap();
        assert_eq!(after_one.used_count, 1);
        assert!(after_one.is_active);

        let after_two = record_use(&conn, &coupon.id).unwrap();
        assert_eq!(after_two.used_count, 2);
        assert!(!after_two.is_active);
    }

    #[test]
    fn unlimited_coupons_stay_active() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let coupon = insert(&conn, &fields("FOREVER", None)).unwrap();
        for _ in 0..5 {
            record_use(&conn, &coupon.id).unwrap();
        }
        let coupon = get(&conn, &coupon.id).unwrap();
        assert_eq!(coupon.used_count, 5);
        assert!(coupon.is_active);
    }

    #[test]
    fn lookup_by_code_is_case_insensitive_on_input() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, &fields("HELLO10", None)).unwrap();
        assert!(find_by_code(&conn, " hello10 ").unwrap().is_some());
        assert!(find_by_code(&conn, "NOPE").unwrap().is_none());
    }
}
