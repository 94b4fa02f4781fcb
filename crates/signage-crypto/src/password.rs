use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Random bytes per salt; rendered as twice as many hex characters.
pub const SALT_BYTES: usize = 16;

/// Stored salt and digest for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub salt: String,
    pub hash: String,
}

/// Fresh random salt as lowercase hex.
pub fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::random();
    hex::encode(bytes)
}

/// hex(SHA-256(salt || password)).
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Salt and hash a new password.
pub fn make_password_hash(password: &str) -> Credential {
    let salt = generate_salt();
    let hash = hash_password(&salt, password);
    Credential { salt, hash }
}

/// Check `password` against a stored salt and hash.
///
/// An empty salt or hash never verifies; callers distinguish "no password
/// set" before getting here.
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    if salt.is_empty() || stored_hash.is_empty() {
        return false;
    }
    let computed = hash_password(salt, password);
    let stored = stored_hash.trim().to_ascii_lowercase();
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}
