use std::collections::BTreeMap;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Admin toggles for profile sections. Missing keys mean enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub links: bool,
    pub banners: bool,
    pub custom_pages: bool,
    pub custom_menu: bool,
    pub updates: bool,
    pub tools: bool,
    pub prompts: bool,
    pub offers: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            links: true,
            banners: true,
            custom_pages: true,
            custom_menu: true,
            updates: true,
            tools: true,
            prompts: true,
            offers: true,
        }
    }
}

impl FeatureFlags {
    fn slot(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "links" => Some(&mut self.links),
            "banners" => Some(&mut self.banners),
            "custom_pages" => Some(&mut self.custom_pages),
            "custom_menu" => Some(&mut self.custom_menu),
            "updates" => Some(&mut self.updates),
            "tools" => Some(&mut self.tools),
            "prompts" => Some(&mut self.prompts),
            "offers" => Some(&mut self.offers),
            _ => None,
        }
    }

    /// Apply `changes` on top of the current flags. Unknown names reject the whole update.
    pub fn merge(&self, changes: &BTreeMap<String, bool>) -> AppResult<Self> {
        let mut merged = *self;
        for (name, enabled) in changes {
            let slot = merged
                .slot(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown feature flag: {}", name)))?;
            *slot = *enabled;
        }
        Ok(merged)
    }
}

pub fn load(conn: &Connection) -> AppResult<FeatureFlags> {
    let raw: String = conn.query_row("SELECT flags FROM settings WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save(conn: &Connection, flags: &FeatureFlags) -> AppResult<FeatureFlags> {
    conn.execute(
        "INSERT INTO settings (id, flags, updated_at) VALUES (1, ?1, datetime('now')) \
         ON CONFLICT(id) DO UPDATE SET flags = excluded.flags, updated_at = excluded.updated_at",
        params![serde_json::to_string(flags)?],
    )?;
    load(conn)
}
