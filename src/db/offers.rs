use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Offer;
use crate::db::new_id;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct OfferFields {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub price_label: Option<String>,
    pub is_active: bool,
    pub position: i64,
}

const OFFER_COLUMNS: &str = "id, user_id, title, description, url, image_url, price_label, \
                             is_active, position, created_at, updated_at";

fn row_to_offer(row: &Row<'_>) -> rusqlite::Result<Offer> {
    Ok(Offer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        url: row.get(4)?,
        image_url: row.get(5)?,
        price_label: row.get(6)?,
        is_active: row.get(7)?,
        position: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub fn list_for_user(conn: &Connection, user_id: &str, active_only: bool) -> AppResult<Vec<Offer>> {
    let sql = format!(
        "SELECT {} FROM offers WHERE user_id = ?1 AND (is_active = 1 OR NOT ?2) \
         ORDER BY position, created_at, rowid",
        OFFER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let offers = stmt
        .query_map(params![user_id, active_only], row_to_offer)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(offers)
}

/// An offer owned by `user_id`. Other users' offers are reported as missing.
pub fn get_owned(conn: &Connection, user_id: &str, id: &str) -> AppResult<Offer> {
    let sql = format!(
        "SELECT {} FROM offers WHERE id = ?1 AND user_id = ?2",
        OFFER_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], row_to_offer)
        .optional()?
        .ok_or(AppError::NotFound)
}

pub fn insert(conn: &Connection, user_id: &str, fields: &OfferFields) -> AppResult<Offer> {
    let id = new_id();
    conn.execute(
        "INSERT INTO offers (id, user_id, title, description, url, image_url, price_label, is_active, position) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user_id,
            fields.title,
            fields.description,
            fields.url,
            fields.image_url,
            fields.price_label,
            fields.is_active,
            fields.position
        ],
    )?;
    get_owned(conn, user_id, &id)
}

pub fn update(conn: &Connection, user_id: &str, id: &str, fields: &OfferFields) -> AppResult<Offer> {
    let rows = conn.execute(
        "UPDATE offers SET title = ?3, description = ?4, url = ?5, image_url = ?6, price_label = ?7, \
         is_active = ?8, position = ?9, updated_at = datetime('now') WHERE id = ?1 AND user_id = ?2",
        params![
            id,
            user_id,
            fields.title,
            fields.description,
            fields.url,
            fields.image_url,
            fields.price_label,
            fields.is_active,
            fields.position
        ],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_owned(conn, user_id, id)
}

pub fn delete(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
    let rows = conn.execute(
        "DELETE FROM offers WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
