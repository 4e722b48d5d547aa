//! Input normalization and validation shared by the handlers.
//!
//! Every function returns the normalized value or an `AppError::BadRequest`
//! describing what was wrong.

use crate::error::{AppError, AppResult};

const RESERVED_USERNAMES: &[&str] = &[
    "admin", "api", "login", "register", "settings", "uploads", "health",
];

pub fn username(raw: &str) -> AppResult<String> {
    let name = raw.trim().to_lowercase();

    if !(3..=30).contains(&name.chars().count()) {
        return Err(AppError::BadRequest(
            "Username must be between 3 and 30 characters".into(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_' and '.'".into(),
        ));
    }
    if RESERVED_USERNAMES.contains(&name.as_str()) {
        return Err(AppError::BadRequest(format!("Username '{}' is reserved", name)));
    }

    Ok(name)
}

pub fn email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    Ok(email)
}

pub fn password(raw: &str, min_len: usize) -> AppResult<()> {
    if raw.chars().count() < min_len {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            min_len
        )));
    }
    Ok(())
}

/// An absolute http(s) URL.
pub fn web_url(raw: &str, field: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(trimmed.to_string()),
        _ => Err(AppError::BadRequest(format!(
            "{} must be an http(s) URL",
            field
        ))),
    }
}

/// An http(s) URL or a site-relative path such as an upload or custom page.
pub fn link_target(raw: &str, field: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        return Ok(trimmed.to_string());
    }
    web_url(trimmed, field)
}

pub fn slug(raw: &str) -> AppResult<String> {
    let slug = raw.trim().to_lowercase();
    let valid = (1..=64).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if !valid {
        return Err(AppError::BadRequest(
            "Page slug must be 1-64 characters of a-z, 0-9 and '-'".into(),
        ));
    }
    Ok(slug)
}

pub fn coupon_code(raw: &str) -> AppResult<String> {
    let code = raw.trim().to_uppercase();
    let valid = (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !valid {
        return Err(AppError::BadRequest(
            "Coupon code must be 3-32 characters of A-Z, 0-9, '_' and '-'".into(),
        ));
    }
    Ok(code)
}

pub fn required(raw: &str, field: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_lowercased_and_checked() {
        assert_eq!(username("  Alice_01 ").unwrap(), "alice_01");
        assert!(username("ab").is_err());
        assert!(username("has space").is_err());
        assert!(username("admin").is_err());
        assert!(username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn email_requires_domain_with_dot() {
        assert_eq!(email("Bob@Example.COM").unwrap(), "bob@example.com");
        assert!(email("bob").is_err());
        assert!(email("bob@localhost").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("a@b@c.com").is_err());
    }

    #[test]
    fn urls_must_be_http() {
        assert!(web_url("https://example.com/x", "url").is_ok());
        assert!(web_url("javascript:alert(1)", "url").is_err());
        assert!(web_url("example.com", "url").is_err());
        assert!(link_target("/about", "url").is_ok());
        assert!(link_target("//evil.com", "url").is_err());
    }

    #[test]
    fn slugs_and_codes() {
        assert_eq!(slug("About-Me").unwrap(), "about-me");
        assert!(slug("-bad").is_err());
        assert!(slug("a b").is_err());
        assert_eq!(coupon_code(" welcome10 ").unwrap(), "WELCOME10");
        assert!(coupon_code("no").is_err());
        assert!(coupon_code("BAD CODE").is_err());
    }
}
