use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Plan, Role, User, UsernameChange};
use crate::db::{new_id, with_transaction};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, plan, coins, is_blocked, created_at, updated_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        plan: row.get(5)?,
        coins: row.get(6)?,
        is_blocked: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn count(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

fn insert_rows(
    conn: &Connection,
    id: &str,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, username, email, password_hash, role],
    )?;
    conn.execute("INSERT INTO profiles (user_id) VALUES (?1)", params![id])?;
    Ok(())
}

/// Insert a user together with their empty profile.
pub fn insert(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> AppResult<User> {
    let id = new_id();
    with_transaction(conn, |conn| {
        insert_rows(conn, &id, username, email, password_hash, role)
    })?;
    get(conn, &id)
}

/// Insert a self-registered user. The first account on an empty instance is
/// an admin; the count and the insert share one write lock.
pub fn register(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<User> {
    let id = new_id();
    with_transaction(conn, |conn| -> AppResult<()> {
        let role = if count(conn)? == 0 {
            Role::Admin
        } else {
            Role::User
        };
        insert_rows(conn, &id, username, email, password_hash, role)
    })?;
    get(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_user).optional()?)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<User> {
    find_by_id(conn, id)?.ok_or(AppError::NotFound)
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![username.to_lowercase()], row_to_user)
        .optional()?)
}

/// Look a user up by username or email.
pub fn find_by_login(conn: &Connection, identifier: &str) -> AppResult<Option<User>> {
    let ident = identifier.trim().to_lowercase();
    let sql = format!(
        "SELECT {} FROM users WHERE username = ?1 OR email = ?1",
        USER_COLUMNS
    );
    Ok(conn.query_row(&sql, params![ident], row_to_user).optional()?)
}

pub fn list(conn: &Connection, search: Option<&str>) -> AppResult<Vec<User>> {
    let pattern = format!("%{}%", search.unwrap_or("").trim().to_lowercase());
    let sql = format!(
        "SELECT {} FROM users WHERE username LIKE ?1 OR email LIKE ?1 ORDER BY created_at, rowid",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params![pattern], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn update_email(conn: &Connection, id: &str, email: &str) -> AppResult<User> {
    let rows = conn.execute(
        "UPDATE users SET email = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id, email],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get(conn, id)
}

/// Rename a user and record the change in their username history.
pub fn change_username(conn: &Connection, id: &str, new_username: &str) -> AppResult<User> {
    let user = get(conn, id)?;
    if user.username == new_username {
        return Ok(user);
    }

    with_transaction(conn, |conn| -> AppResult<()> {
        conn.execute(
            "UPDATE users SET username = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, new_username],
        )?;
        conn.execute(
            "INSERT INTO username_history (id, user_id, old_username, new_username) VALUES (?1, ?2, ?3, ?4)",
            params![new_id(), id, user.username, new_username],
        )?;
        Ok(())
    })?;

    get(conn, id)
}

pub fn username_history(conn: &Connection, user_id: &str) -> AppResult<Vec<UsernameChange>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, old_username, new_username, changed_at FROM username_history \
         WHERE user_id = ?1 ORDER BY changed_at DESC, rowid DESC",
    )?;
    let history = stmt
        .query_map(params![user_id], |row| {
            Ok(UsernameChange {
                id: row.get(0)?,
                user_id: row.get(1)?,
                old_username: row.get(2)?,
                new_username: row.get(3)?,
                changed_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

pub fn update_password_hash(conn: &Connection, id: &str, password_hash: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id, password_hash],
    )?;
    Ok(())
}

/// Fields an admin may change on any account.
#[derive(Debug, Default)]
pub struct AdminChanges {
    pub role: Option<Role>,
    pub plan: Option<Plan>,
    pub is_blocked: Option<bool>,
}

pub fn apply_admin_changes(conn: &Connection, id: &str, changes: &AdminChanges) -> AppResult<User> {
    get(conn, id)?;

    if let Some(role) = changes.role {
        conn.execute(
            "UPDATE users SET role = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, role],
        )?;
    }
    if let Some(plan) = changes.plan {
        conn.execute(
            "UPDATE users SET plan = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, plan],
        )?;
    }
    if let Some(blocked) = changes.is_blocked {
        conn.execute(
            "UPDATE users SET is_blocked = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, blocked],
        )?;
    }

    get(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
