use gator_portal::errors::ApiError;
use gator_portal::models::{
    Greeting, RegisterRequest, RegisterResponse, User, UserProfile, is_valid_email,
};

// --- Test Utilities ---

fn request(email: &str, password: &str, first: &str, last: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}

fn failing_field(request: &RegisterRequest) -> String {
    match request.validate() {
        Err(ApiError::Validation { field, .. }) => field,
        Err(other) => panic!("expected a validation error, got {other:?}"),
        Ok(()) => panic!("expected validation to fail for {request:?}"),
    }
}

// --- Email Syntax ---

#[test]
fn test_is_valid_email_accepts_reasonable_addresses() {
    for email in [
        "a@x.com",
        "jane.doe@example.co.uk",
        "user+tag@sub.example.org",
        "UPPER@EXAMPLE.COM",
    ] {
        assert!(is_valid_email(email), "should accept {email}");
    }
}

#[test]
fn test_is_valid_email_rejects_malformed_addresses() {
    for email in [
        "",
        "plain-text",
        "@example.com",
        "user@",
        "user@nodot",
        "user@.com",
        "user@domain.",
        "two@at@example.com",
        "white space@example.com",
        "user@exa mple.com",
    ] {
        assert!(!is_valid_email(email), "should reject {email}");
    }
}

// --- Registration Validation ---

#[test]
fn test_validate_accepts_a_complete_submission() {
    assert!(request("a@x.com", "pw1", "A", "B").validate().is_ok());
}

#[test]
fn test_validate_reports_the_first_failing_field() {
    assert_eq!(failing_field(&request("", "pw", "A", "B")), "email");
    assert_eq!(failing_field(&request("   ", "pw", "A", "B")), "email");
    assert_eq!(failing_field(&request("bad-email", "pw", "A", "B")), "email");
    assert_eq!(failing_field(&request("a@x.com", "", "A", "B")), "password");
    assert_eq!(failing_field(&request("a@x.com", "pw", "", "B")), "first_name");
    assert_eq!(failing_field(&request("a@x.com", "pw", "A", " ")), "last_name");

    // Several bad fields: only the first one is reported.
    assert_eq!(failing_field(&request("", "", "", "")), "email");
}

#[test]
fn test_validate_trims_but_does_not_trim_password() {
    // A whitespace-padded email is validated on its trimmed form.
    assert!(request(" a@x.com ", "pw", "A", "B").validate().is_ok());
    // A whitespace-only password is still a password; only empty is rejected.
    assert!(request("a@x.com", "   ", "A", "B").validate().is_ok());
}

#[test]
fn test_normalized_email_is_trimmed_and_lowercased() {
    let payload = request("  Jane.DOE@Example.COM  ", "pw", "Jane", "Doe");
    assert_eq!(payload.normalized_email(), "jane.doe@example.com");
}

// --- Serialization Contracts ---

#[test]
fn test_register_response_omits_absent_warning() {
    let response = RegisterResponse {
        user: UserProfile {
            id: 1,
            email: "a@x.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            roles: vec![],
        },
        warning: None,
    };

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("warning").is_none(), "absent warning must not serialize");
    assert_eq!(json["user"]["email"], "a@x.com");
}

#[test]
fn test_register_response_carries_warning_when_present() {
    let response = RegisterResponse {
        user: UserProfile::default(),
        warning: Some("confirmation email could not be sent".to_string()),
    };

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["warning"], "confirmation email could not be sent");
}

#[test]
fn test_user_profile_projection_excludes_credentials() {
    let user = User {
        id: 7,
        email: "a@x.com".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        password_hash: "$argon2id$...".to_string(),
        auth_token: "session-token".to_string(),
        ..User::default()
    };

    let profile = UserProfile::from_user(&user, vec!["admin".to_string()]);
    let json = serde_json::to_value(&profile).unwrap();

    assert_eq!(json["id"], 7);
    assert_eq!(json["roles"][0], "admin");
    // The projection type simply has no credential fields to leak.
    assert!(json.get("password_hash").is_none());
    assert!(json.get("auth_token").is_none());
    assert!(json.get("reset_token_hash").is_none());
}

#[test]
fn test_greeting_serializes_both_fields() {
    let greeting = Greeting {
        name: "A".to_string(),
        message: "Hello A!".to_string(),
    };

    let json = serde_json::to_value(&greeting).unwrap();
    assert_eq!(json["name"], "A");
    assert_eq!(json["message"], "Hello A!");
}
