use crate::error::AppResult;

pub fn hash(plaintext: &str, cost: u32) -> AppResult<String> {
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Constant-time check via bcrypt. A malformed stored hash never verifies.
pub fn verify(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash("correct horse", 4).unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(verify("correct horse", &hashed));
        assert!(!verify("wrong horse", &hashed));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
    }
}
