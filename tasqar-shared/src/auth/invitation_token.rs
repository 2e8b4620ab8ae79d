/// Invitation token utilities
///
/// Invitation tokens are 32 random alphanumeric characters (base62). The
/// plaintext goes into the emailed sign-up link; only the hex SHA-256 hash is
/// stored.
///
/// # Example
///
/// ```
/// use tasqar_shared::auth::invitation_token::{generate_token, hash_token, is_valid_format};
///
/// let (token, hash) = generate_token();
/// assert!(is_valid_format(&token));
/// assert_eq!(hash_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of an invitation token, in characters
pub const TOKEN_LENGTH: usize = 32;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a new token, returning `(plaintext, sha256_hex)`
pub fn generate_token() -> (String, String) {
    let mut rng = rand::thread_rng();

    let token: String = (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let hash = hash_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of a token (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Whether `token` has the shape of an invitation token
///
/// Lets lookups reject garbage without touching the database.
pub fn is_valid_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Sign-up link sent in invitation emails
pub fn invitation_link(app_base_url: &str, token: &str) -> String {
    format!(
        "{}/register?invitation={}",
        app_base_url.trim_end_matches('/'),
        token
    )
}
