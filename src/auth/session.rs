use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::db::{new_id, users};
use crate::error::AppResult;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> AppResult<String> {
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![new_id(), user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// The user owning an unexpired session token.
pub fn user_for_token(conn: &Connection, token: &str) -> AppResult<Option<User>> {
    let user_id: Option<String> = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > datetime('now')",
            params![token],
            |row| row.get(0),
        )
        .optional()?;

    match user_id {
        Some(id) => users::find_by_id(conn, &id),
        None => Ok(None),
    }
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> AppResult<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Revoke every session of a user, optionally keeping one token alive.
pub fn delete_user_sessions(conn: &Connection, user_id: &str, keep: Option<&str>) -> AppResult<usize> {
    let removed = conn.execute(
        "DELETE FROM sessions WHERE user_id = ?1 AND (?2 IS NULL OR token != ?2)",
        params![user_id, keep],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::test_support::test_pool;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_resolves_to_its_user_until_deleted() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let user = users::insert(&conn, "alice", "a@example.com", "h", Role::User).unwrap();

        let token = create_session(&conn, &user.id, 1).unwrap();
        assert_eq!(user_for_token(&conn, &token).unwrap().unwrap().id, user.id);
        assert!(user_for_token(&conn, "bogus").unwrap().is_none());

        delete_session(&conn, &token).unwrap();
        assert!(user_for_token(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_ignored() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let user = users::insert(&conn, "bob", "b@example.com", "h", Role::User).unwrap();

        let token = create_session(&conn, &user.id, 0).unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 hours') WHERE token = ?1",
            params![token],
        )
        .unwrap();
        assert!(user_for_token(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn revoking_keeps_the_current_session() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let user = users::insert(&conn, "carol", "c@example.com", "h", Role::User).unwrap();

        let current = create_session(&conn, &user.id, 1).unwrap();
        let other = create_session(&conn, &user.id, 1).unwrap();

        assert_eq!(delete_user_sessions(&conn, &user.id, Some(current.as_str())).unwrap(), 1);
        assert!(user_for_token(&conn, &current).unwrap().is_some());
        assert!(user_for_token(&conn, &other).unwrap().is_none());
    }
}
