use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::db::models::Profile;
use crate::error::{AppError, AppResult};

fn json_column<T: DeserializeOwned>(raw: String, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn find(conn: &Connection, user_id: &str) -> AppResult<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT user_id, display_name, bio, avatar_url, layout, theme, links, banners, \
             custom_pages, custom_menu, updates, tool_ids, prompt_ids, updated_at \
             FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Profile {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    bio: row.get(2)?,
                    avatar_url: row.get(3)?,
                    layout: row.get(4)?,
                    theme: json_column(row.get(5)?, 5)?,
                    links: json_column(row.get(6)?, 6)?,
                    banners: json_column(row.get(7)?, 7)?,
                    custom_pages: json_column(row.get(8)?, 8)?,
                    custom_menu: json_column(row.get(9)?, 9)?,
                    updates: json_column(row.get(10)?, 10)?,
                    tool_ids: json_column(row.get(11)?, 11)?,
                    prompt_ids: json_column(row.get(12)?, 12)?,
                    updated_at: row.get(13)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

pub fn get(conn: &Connection, user_id: &str) -> AppResult<Profile> {
    find(conn, user_id)?.ok_or(AppError::NotFound)
}

/// Persist every field of `profile`, replacing what is stored.
pub fn save(conn: &Connection, profile: &Profile) -> AppResult<Profile> {
    let rows = conn.execute(
        "UPDATE profiles SET display_name = ?2, bio = ?3, avatar_url = ?4, layout = ?5, \
         theme = ?6, links = ?7, banners = ?8, custom_pages = ?9, custom_menu = ?10, \
         updates = ?11, tool_ids = ?12, prompt_ids = ?13, updated_at = datetime('now') \
         WHERE user_id = ?1",
        params![
            profile.user_id,
            profile.display_name,
            profile.bio,
            profile.avatar_url,
            profile.layout,
            serde_json::to_string(&profile.theme)?,
            serde_json::to_string(&profile.links)?,
            serde_json::to_string(&profile.banners)?,
            serde_json::to_string(&profile.custom_pages)?,
            serde_json::to_string(&profile.custom_menu)?,
            serde_json::to_string(&profile.updates)?,
            serde_json::to_string(&profile.tool_ids)?,
            serde_json::to_string(&profile.prompt_ids)?,
        ],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get(conn, &profile.user_id)
}
