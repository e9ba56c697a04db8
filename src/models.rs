use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::errors::ApiError;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `app_user` table. This struct is
/// internal to the service: it carries the password hash and recovery state, so it
/// is never serialized into a response. API surfaces use `UserProfile` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i32,
    // Unique across all users. Stored lowercased for case-insensitive matching.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    // Argon2id PHC string (one-way, salted). Plaintext is never stored or logged.
    pub password_hash: String,
    // Inactive accounts cannot authenticate.
    pub active: bool,
    // Stable per-account session token. Immutable once assigned and never reused
    // across accounts; sessions are bound to it rather than to the user id.
    pub auth_token: String,
    // Login audit fields, shifted on each successful authentication.
    pub last_login_at: Option<DateTime<Utc>>,
    pub current_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub current_login_ip: Option<String>,
    pub login_count: i32,
    pub confirmed_at: Option<DateTime<Utc>>,
    // Password recovery state: the argon2 hash of the outstanding reset token and
    // its expiry. The token itself is only ever sent to the user's mailbox.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

/// Role
///
/// A named permission label from the `app_role` table. Membership in a role is what
/// authorizes access to role-gated routes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: i32,
    // Unique role name, e.g. "admin".
    pub name: String,
    pub description: String,
}

/// NewUser
///
/// Insertion payload handed to the repository by the registration service, after
/// validation and password hashing have already happened.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub auth_token: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// All four fields are required and non-empty; the email must be syntactically
/// valid and not already registered.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    /// validate
    ///
    /// Field-level validation for a registration submission. Returns the first
    /// failing field so the caller can render a form error against it. Duplicate
    /// email detection happens separately, against the repository.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() {
            return Err(ApiError::validation("email", "is required"));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ApiError::validation("email", "is not a valid email address"));
        }
        if self.password.is_empty() {
            return Err(ApiError::validation("password", "is required"));
        }
        if self.first_name.trim().is_empty() {
            return Err(ApiError::validation("first_name", "is required"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ApiError::validation("last_name", "is required"));
        }
        Ok(())
    }

    /// normalized_email
    ///
    /// Canonical form of the submitted email: trimmed and lowercased. All storage
    /// and lookups use this form, which is what makes email matching
    /// case-insensitive everywhere.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// is_valid_email
///
/// Minimal syntactic check: one '@' separating a non-empty local part from a
/// domain that contains a dot, with no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        _ => false,
    }
}

/// LoginRequest
///
/// Input payload for the credential service (POST /login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ForgotPasswordRequest
///
/// Input payload for initiating password recovery (POST /forgot-password).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// ResetPasswordRequest
///
/// Input payload for completing password recovery (POST /reset-password).
/// The token is the opaque value delivered by the recovery email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

/// CreateRoleRequest
///
/// Input payload for the administrative role creation endpoint (POST /admin/roles).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// --- Response Schemas (Output) ---

/// UserProfile
///
/// The outward-facing projection of a `User`: identity and role membership only,
/// never credential or audit internals.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl UserProfile {
    /// from_user
    ///
    /// Projects the internal record plus its resolved role set into the public shape.
    pub fn from_user(user: &User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles,
        }
    }
}

/// RegisterResponse
///
/// Output of a successful registration. `warning` is populated when the
/// confirmation email could not be dispatched; the account is created regardless.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterResponse {
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// LoginResponse
///
/// Output of a successful login: the signed session token plus the profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Greeting
///
/// Output of the two read-only views: the home page and the admin-gated
/// protected page. Renders the authenticated user's first name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Greeting {
    pub name: String,
    pub message: String,
}
