//! API key generation and hashing
//!
//! Keys are HMAC-SHA256 hashed with a server secret before storage, so a
//! leaked database alone is not enough to verify or forge keys.

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::core::constants::{API_KEY_PREFIX, API_KEY_PREFIX_DISPLAY_LEN, API_KEY_RANDOM_LENGTH};

type HmacSha256 = Hmac<Sha256>;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an opaque project API key: le_{random_base62}
pub fn generate_api_key() -> String {
    let random: String = (0..API_KEY_RANDOM_LENGTH)
        .map(|_| CHARSET[OsRng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("{}{}", API_KEY_PREFIX, random)
}

/// HMAC-SHA256 hash of key with server secret (hex encoded)
pub fn hash_api_key(key: &str, server_secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(server_secret).expect("HMAC accepts any key length");
    mac.update(key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Extract the non-secret display prefix (e.g. "le_a1B2c3D4")
pub fn key_prefix(key: &str) -> String {
    key.chars().take(API_KEY_PREFIX_DISPLAY_LEN).collect()
}

/// Validate key format: le_{base62}
pub fn is_valid_api_key(key: &str) -> bool {
    key.starts_with(API_KEY_PREFIX)
        && key.len() == API_KEY_PREFIX.len() + API_KEY_RANDOM_LENGTH
        && key[API_KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

/// Extract key from a Bearer authorization header
pub fn extract_key_from_header(header: &str) -> Option<String> {
    header
        .strip_prefix("Bearer ")
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + API_KEY_RANDOM_LENGTH);
        assert!(is_valid_api_key(&key));
    }

    #[test]
    fn test_generate_api_key_uniqueness() {
        let key1 = generate_api_key();
        let key2 = generate_api_key();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_hash_api_key() {
        let key = "le_a1B2c3D4e5F6g7H8i9J0k1L2m3N4o5P6q7R8s9T0";
        let secret = b"test-secret-32-bytes-long-here!!";

        let hash1 = hash_api_key(key, secret);
        let hash2 = hash_api_key(key, secret);

        // Same key + secret = same hash
        assert_eq!(hash1, hash2);

        // Hex encoded (64 chars for SHA256)
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));

        // Different secret = different hash
        let hash3 = hash_api_key(key, b"another-secret-entirely!!!!!!!!!");
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_key_prefix() {
        let key = "le_a1B2c3D4e5F6g7H8i9J0k1L2m3N4o5P6q7R8s9T0";
        assert_eq!(key_prefix(key), "le_a1B2c3D4");
    }

    #[test]
    fn test_is_valid_api_key() {
        assert!(is_valid_api_key(
            "le_a1B2c3D4e5F6g7H8i9J0k1L2m3N4o5P6q7R8s9T0"
        ));

        // Too short
        assert!(!is_valid_api_key("le_abc123"));

        // Wrong prefix
        assert!(!is_valid_api_key(
            "xx_a1B2c3D4e5F6g7H8i9J0k1L2m3N4o5P6q7R8s9T0"
        ));

        // Invalid characters
        assert!(!is_valid_api_key(
            "le_a1B2c3D4e5F6g7H8i9J0k1L2m3N4o5P6q7R8s9-0"
        ));
    }

    #[test]
    fn test_extract_key_from_header() {
        assert_eq!(
            extract_key_from_header("Bearer le_abc123"),
            Some("le_abc123".to_string())
        );
        assert!(extract_key_from_header("Basic bGVfYWJj").is_none());
        assert!(extract_key_from_header("Bearer ").is_none());
        assert!(extract_key_from_header("").is_none());
    }
}
