//! API token literals.
//!
//! A full token reads `qdk_<environment>_<64 hex chars>`. The leading
//! characters double as the stored lookup prefix and the only part ever
//! shown after creation; the full value survives only as an argon2 hash.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

/// Literal prefix that tags a bearer value as an API token.
pub const TOKEN_PREFIX: &str = "qdk_";

/// Length of the stored/displayed token prefix.
pub const DISPLAY_PREFIX_LEN: usize = 12;

/// Number of random bytes behind the hex-encoded secret part.
const SECRET_BYTES: usize = 32;

#[derive(Debug)]
pub struct GeneratedApiToken {
    /// Full literal value. Returned to the caller exactly once.
    pub value: String,
    /// First [`DISPLAY_PREFIX_LEN`] characters, persisted for lookup.
    pub prefix: String,
}

pub fn generate_api_token(environment: &str) -> GeneratedApiToken {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let value = format!("{}{}_{}", TOKEN_PREFIX, environment, hex::encode(bytes));
    let prefix = display_prefix(&value);
    GeneratedApiToken { value, prefix }
}

/// Returns true when a bearer value is an API token rather than a
/// session JWT.
pub fn is_api_token(bearer: &str) -> bool {
    bearer.starts_with(TOKEN_PREFIX)
}

pub fn display_prefix(value: &str) -> String {
    value.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Masked rendering used everywhere after creation (`qdk_dev_a8f2...`).
pub fn masked(prefix: &str) -> String {
    format!("{}...", prefix)
}

pub fn hash_api_token(value: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(value.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash api token: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_api_token_hash(value: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid api token hash: {}", e))?;
    match Argon2::default().verify_password(value.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Api token verification error: {}", e)),
    }
}
