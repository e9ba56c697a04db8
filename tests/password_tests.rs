use gator_portal::password::{
    equalize_verification_cost, generate_reset_token, generate_session_token, hash_password,
    verify_password,
};

const PEPPER: &str = "test-pepper";

#[test]
fn test_hash_then_verify_roundtrip() {
    let hash = hash_password("s3cret", PEPPER).unwrap();

    // PHC string format, argon2id variant.
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("s3cret", PEPPER, &hash));
    assert!(!verify_password("wrong", PEPPER, &hash));
}

#[test]
fn test_verification_requires_the_same_pepper() {
    let hash = hash_password("s3cret", PEPPER).unwrap();

    // The right password with the wrong pepper must not verify: a leaked
    // database row alone is not enough.
    assert!(!verify_password("s3cret", "another-pepper", &hash));
}

#[test]
fn test_hashing_salts_every_invocation() {
    let first = hash_password("s3cret", PEPPER).unwrap();
    let second = hash_password("s3cret", PEPPER).unwrap();

    assert_ne!(first, second, "each hash carries a fresh random salt");
    assert!(verify_password("s3cret", PEPPER, &first));
    assert!(verify_password("s3cret", PEPPER, &second));
}

#[test]
fn test_verify_rejects_malformed_stored_hash() {
    assert!(!verify_password("s3cret", PEPPER, "not-a-phc-string"));
    assert!(!verify_password("s3cret", PEPPER, ""));
}

#[test]
fn test_equalize_verification_cost_never_panics() {
    // The dummy verification is fire-and-forget; any input must be safe.
    equalize_verification_cost("", "");
    equalize_verification_cost("password attempt", PEPPER);
}

#[test]
fn test_session_tokens_are_unique_and_opaque() {
    let a = generate_session_token();
    let b = generate_session_token();

    assert_ne!(a, b);
    // Simple (hyphenless) UUID form.
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_reset_tokens_are_unique_and_urlsafe() {
    let a = generate_reset_token();
    let b = generate_reset_token();

    assert_ne!(a, b);
    // 32 bytes base64url without padding: 43 characters, no '+', '/' or '='.
    assert_eq!(a.len(), 43);
    assert!(
        a.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[test]
fn test_reset_token_verifies_against_its_own_hash_only() {
    let token = generate_reset_token();
    let stored = hash_password(&token, PEPPER).unwrap();

    assert!(verify_password(&token, PEPPER, &stored));
    assert!(!verify_password(&generate_reset_token(), PEPPER, &stored));
}
