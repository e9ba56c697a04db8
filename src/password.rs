use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

use crate::errors::ApiError;

/// A syntactically valid argon2id hash that no real password produces. Unknown-email
/// logins verify against this so the lookup-miss path costs the same as a real
/// verification, keeping the two failure modes indistinguishable by timing.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY";

/// hash_password
///
/// One-way hash of a plaintext password using argon2id with a fresh random salt.
/// The application-wide pepper from configuration is mixed into the input, so a
/// leaked database alone is not enough to mount an offline attack.
pub fn hash_password(password: &str, pepper: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let peppered = format!("{password}{pepper}");

    let hash = Argon2::default()
        .hash_password(peppered.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("password hashing failed: {e}");
            ApiError::validation("password", "could not be processed")
        })?;

    Ok(hash.to_string())
}

/// verify_password
///
/// Checks a plaintext password against a stored PHC string. The argon2 parameters
/// embedded in the hash drive the verification, and the comparison inside the
/// argon2 crate is constant-time.
pub fn verify_password(password: &str, pepper: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("stored password hash is malformed: {e}");
            return false;
        }
    };

    let peppered = format!("{password}{pepper}");
    Argon2::default()
        .verify_password(peppered.as_bytes(), &parsed)
        .is_ok()
}

/// equalize_verification_cost
///
/// Runs a throwaway verification against a fixed hash. Called on the unknown-email
/// login path so it takes roughly as long as a wrong-password attempt.
pub fn equalize_verification_cost(password: &str, pepper: &str) {
    let _ = verify_password(password, pepper, DUMMY_HASH);
}

/// generate_session_token
///
/// Produces the stable per-account session token assigned at registration and
/// rotated on logout or password reset. Distinct from the login password and
/// never reused across accounts.
pub fn generate_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// generate_reset_token
///
/// 256 bits of CSPRNG output, base64url-encoded without padding. Only the argon2
/// hash of this value is persisted; the token itself travels in the recovery email.
pub fn generate_reset_token() -> String {
    let mut token_bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut token_bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}
