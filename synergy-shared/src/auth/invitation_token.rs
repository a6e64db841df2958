/// Invitation tokens
///
/// An invitation email carries a random token in its accept and decline
/// links. Only the SHA-256 hash is stored in `project_invitations.token_hash`,
/// so a database read does not reveal usable links.
///
/// # Token Format
///
/// `inv_` followed by 40 base62 characters (44 chars total).
///
/// # Example
///
/// ```
/// use synergy_shared::auth::invitation_token::{generate_token, hash_token, is_valid_format};
///
/// let (token, hash) = generate_token();
/// assert!(token.starts_with("inv_"));
/// assert!(is_valid_format(&token));
/// assert_eq!(hash_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_RANDOM_LENGTH: usize = 40;

const TOKEN_PREFIX: &str = "inv_";

pub const TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Returns `(plaintext_token, sha256_hex)`.
pub fn generate_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of the token (64 chars).
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Cheap shape check before touching the database.
pub fn is_valid_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token
            .strip_prefix(TOKEN_PREFIX)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric()))
}
