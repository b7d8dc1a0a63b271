//! API key issuance and hashing, plus shared-secret checks.
//!
//! Keys are shown to the client once; only their SHA-256 hash is stored.

use subtle::ConstantTimeEq;

use crate::ServiceError;

/// Prefix that marks a Tethered API key.
pub const API_KEY_PREFIX: &str = "tsk_";

/// Generate a new API key: prefix + 32 random bytes, hex-encoded.
pub fn generate_api_key() -> Result<String, ServiceError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
    Ok(format!("{API_KEY_PREFIX}{}", hex::encode(bytes)))
}

/// Hash a token with SHA-256 for storage. Returns hex-encoded.
pub fn hash_token(token: &str) -> String {
    use sha2::Digest;
    let hash = sha2::Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

/// Compare a presented shared secret against the configured one in
/// constant time.
///
/// An empty configured secret never matches, so an unconfigured
/// deployment rejects every scheduled call.
pub fn shared_secret_matches(expected: &str, provided: Option<&str>) -> bool {
    let expected = expected.trim();
    let Some(provided) = provided.map(str::trim) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_and_unique() {
        let a = generate_api_key().unwrap();
        let b = generate_api_key().unwrap();
        assert!(a.starts_with(API_KEY_PREFIX));
        assert_eq!(a.len(), API_KEY_PREFIX.len() + 64);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_hex() {
        let h = hash_token("tsk_abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("tsk_abc"));
        assert_ne!(h, hash_token("tsk_abd"));
    }

    #[test]
    fn shared_secret_fails_closed() {
        assert!(shared_secret_matches("s3cret", Some("s3cret")));
        assert!(shared_secret_matches("s3cret", Some(" s3cret ")));
        assert!(!shared_secret_matches("s3cret", Some("s3cre")));
        assert!(!shared_secret_matches("s3cret", Some("s3cret!")));
        assert!(!shared_secret_matches("s3cret", Some("S3CRET")));
        assert!(!shared_secret_matches("s3cret", None));
        assert!(!shared_secret_matches("", Some("")));
        assert!(!shared_secret_matches("  ", Some("  ")));
    }
}
