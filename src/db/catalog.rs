//! Admin-managed tools and prompts that users can feature on their profiles.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Prompt, Tool};
use crate::db::new_id;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ToolFields {
    pub name: String,
    pub description: String,
    pub url: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct PromptFields {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub is_active: bool,
}

const TOOL_COLUMNS: &str =
    "id, name, description, url, category, image_url, is_active, created_at, updated_at";

const PROMPT_COLUMNS: &str = "id, title, body, category, is_active, created_at, updated_at";

fn row_to_tool(row: &Row<'_>) -> rusqlite::Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        url: row.get(3)?,
        category: row.get(4)?,
        image_url: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_prompt(row: &Row<'_>) -> rusqlite::Result<Prompt> {
    Ok(Prompt {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        category: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

// -- Tools --

pub fn list_tools(conn: &Connection, include_inactive: bool) -> AppResult<Vec<Tool>> {
    let sql = format!(
        "SELECT {} FROM tools WHERE is_active = 1 OR ?1 ORDER BY name COLLATE NOCASE",
        TOOL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let tools = stmt
        .query_map(params![include_inactive], row_to_tool)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tools)
}

pub fn find_tool(conn: &Connection, id: &str) -> AppResult<Option<Tool>> {
    let sql = format!("SELECT {} FROM tools WHERE id = ?1", TOOL_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_tool).optional()?)
}

pub fn get_tool(conn: &Connection, id: &str) -> AppResult<Tool> {
    find_tool(conn, id)?.ok_or(AppError::NotFound)
}

pub fn insert_tool(conn: &Connection, fields: &ToolFields) -> AppResult<Tool> {
    let id = new_id();
    conn.execute(
        "INSERT INTO tools (id, name, description, url, category, image_url, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            fields.name,
            fields.description,
            fields.url,
            fields.category,
            fields.image_url,
            fields.is_active
        ],
    )?;
    get_tool(conn, &id)
}

pub fn update_tool(conn: &Connection, id: &str, fields: &ToolFields) -> AppResult<Tool> {
    let rows = conn.execute(
        "UPDATE tools SET name = ?2, description = ?3, url = ?4, category = ?5, image_url = ?6, \
         is_active = ?7, updated_at = datetime('now') WHERE id = ?1",
        params![
            id,
            fields.name,
            fields.description,
            fields.url,
            fields.category,
            fields.image_url,
            fields.is_active
        ],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_tool(conn, id)
}

pub fn delete_tool(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM tools WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Active tools among `ids`, in the order given. Unknown ids are skipped.
pub fn active_tools_by_ids(conn: &Connection, ids: &[String]) -> AppResult<Vec<Tool>> {
    let mut tools = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(tool) = find_tool(conn, id)?.filter(|t| t.is_active) {
            tools.push(tool);
        }
    }
    Ok(tools)
}

// -- Prompts --

pub fn list_prompts(conn: &Connection, include_inactive: bool) -> AppResult<Vec<Prompt>> {
    let sql = format!(
        "SELECT {} FROM prompts WHERE is_active = 1 OR ?1 ORDER BY title COLLATE NOCASE",
        PROMPT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let prompts = stmt
        .query_map(params![include_inactive], row_to_prompt)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(prompts)
}

pub fn find_prompt(conn: &Connection, id: &str) -> AppResult<Option<Prompt>> {
    let sql = format!("SELECT {} FROM prompts WHERE id = ?1", PROMPT_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_prompt).optional()?)
}

pub fn get_prompt(conn: &Connection, id: &str) -> AppResult<Prompt> {
    find_prompt(conn, id)?.ok_or(AppError::NotFound)
}

pub fn insert_prompt(conn: &Connection, fields: &PromptFields) -> AppResult<Prompt> {
    let id = new_id();
    conn.execute(
        "INSERT INTO prompts (id, title, body, category, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, fields.title, fields.body, fields.category, fields.is_active],
    )?;
    get_prompt(conn, &id)
}

pub fn update_prompt(conn: &Connection, id: &str, fields: &PromptFields) -> AppResult<Prompt> {
    let rows = conn.execute(
        "UPDATE prompts SET title = ?2, body = ?3, category = ?4, is_active = ?5, \
         updated_at = datetime('now') WHERE id = ?1",
        params![id, fields.title, fields.body, fields.category, fields.is_active],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_prompt(conn, id)
}

pub fn delete_prompt(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Active prompts among `ids`, in the order given. Unknown ids are skipped.
pub fn active_prompts_by_ids(conn: &Connection, ids: &[String]) -> AppResult<Vec<Prompt>> {
    let mut prompts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(prompt) = find_prompt(conn, id)?.filter(|p| p.is_active) {
            prompts.push(prompt);
        }
    }
    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::error::unique_violation;

    fn tool(name: &str, active: bool) -> ToolFields {
        ToolFields {
            name: name.to_string(),
            description: format!("{} description", name),
            url: format!("https://{}.example", name.to_lowercase()),
            category: Some("ai".into()),
            image_url: None,
            is_active: active,
        }
    }

    #[test]
    fn insert_tool_persists_fields() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();

        let created = insert_tool(&conn, &tool("Figma", true)).unwrap();
        assert_eq!(created.name, "Figma");
        assert_eq!(created.description, "Figma description");
        assert_eq!(created.url, "https://figma.example");
        assert_eq!(created.category.as_deref(), Some("ai"));
        assert!(created.is_active);
    }

    #[test]
    fn tool_names_are_unique_ignoring_case() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        insert_tool(&conn, &tool("Notion", true)).unwrap();

        match insert_tool(&conn, &tool("NOTION", true)) {
            Err(AppError::Database(e)) => assert_eq!(unique_violation(&e).as_deref(), Some("name")),
            other => panic!("expected unique violation, got {:?}", other),
        }
    }

    #[test]
    fn list_hides_inactive_unless_asked() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        insert_tool(&conn, &tool("Zed", true)).unwrap();
        insert_tool(&conn, &tool("Atom", false)).unwrap();

        let public = list_tools(&conn, false).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "Zed");

        let all = list_tools(&conn, true).unwrap();
        assert_eq!(all.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), ["Atom", "Zed"]);
    }

    #[test]
    fn resolving_ids_skips_missing_and_inactive() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let a = insert_tool(&conn, &tool("A1", true)).unwrap();
        let b = insert_tool(&conn, &tool("B1", false)).unwrap();

        let ids = vec![b.id.clone(), "gone".to_string(), a.id.clone()];
        let resolved = active_tools_by_ids(&conn, &ids).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, a.id);
    }

    #[test]
    fn prompt_crud_and_unique_title() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let fields = PromptFields {
            title: "Summarize".into(),
            body: "Summarize this text".into(),
            category: None,
            is_active: true,
        };

        let created = insert_prompt(&conn, &fields).unwrap();
        assert_eq!(created.body, "Summarize this text");
        assert!(matches!(
            insert_prompt(&conn, &fields),
            Err(AppError::Database(_))
        ));

        let updated = update_prompt(
            &conn,
            &created.id,
            &PromptFields {
                body: "Summarize briefly".into(),
                ..fields.clone()
            },
        )
        .unwrap();
        assert_eq!(updated.body, "Summarize briefly");

        delete_prompt(&conn, &created.id).unwrap();
        assert!(find_prompt(&conn, &created.id).unwrap().is_none());
        assert!(matches!(
            delete_prompt(&conn, &created.id),
            Err(AppError::NotFound)
        ));
    }
}
