/// Signage Crypto Library
///
/// Salted password hashing for dashboard accounts. Only the salt and the
/// digest are ever persisted; plaintext passwords never leave this crate.
pub mod password;

pub use password::{Credential, generate_salt, hash_password, make_password_hash, verify_password};
