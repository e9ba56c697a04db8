use crate::{
    AppState,
    auth::{AuthUser, issue_session_token},
    errors::ApiError,
    models::{
        CreateRoleRequest, ForgotPasswordRequest, Greeting, LoginRequest, LoginResponse, NewUser,
        RegisterRequest, RegisterResponse, ResetPasswordRequest, Role, UserProfile,
    },
    password,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};

/// How long a password-recovery token stays redeemable.
const RESET_TOKEN_TTL_MINUTES: i64 = 30;

/// client_ip
///
/// Best-effort client address for the login audit trail: the first entry of
/// `x-forwarded-for` when present. Absent header means no IP is recorded, which
/// the audit columns allow.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

// --- Registration Service ---

/// register_user
///
/// [Public Route] Creates a new account from a validated submission.
///
/// *Flow*: field validation → duplicate-email check → argon2 hash → insert with an
/// empty role set and a fresh session token. The database unique constraint backs
/// the duplicate check, so a concurrent race still surfaces as a field error.
///
/// *Side effect*: dispatches a confirmation email. A delivery failure is logged
/// and reported as a non-fatal `warning` in the response; it never rolls back the
/// created record.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate()?;
    let email = payload.normalized_email();

    // Up-front duplicate check for a friendly error; the unique constraint in
    // `create_user` catches whatever slips between the check and the insert.
    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::validation("email", "already exists"));
    }

    let password_hash = password::hash_password(&payload.password, &state.config.password_pepper)?;
    let new_user = NewUser {
        email,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        password_hash,
        auth_token: password::generate_session_token(),
    };

    let user = state.repo.create_user(new_user).await?;
    tracing::info!(user_id = user.id, "user registered");

    // Non-fatal by contract: the account exists whether or not the mail goes out.
    let warning = match state
        .mailer
        .send_confirmation(&user.email, &user.first_name)
        .await
    {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(user_id = user.id, "confirmation email dispatch failed: {e}");
            Some("confirmation email could not be sent".to_string())
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserProfile::from_user(&user, vec![]),
            warning,
        }),
    ))
}

// --- Credential Service ---

/// login
///
/// [Public Route] Verifies an email/password pair and establishes a session.
///
/// *Failure shape*: unknown email, wrong password, and inactive account all return
/// the same generic authentication error. The unknown-email path runs a dummy
/// verification so its timing matches a wrong-password attempt, and the audit
/// fields are only touched after a fully successful verification.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Authentication failure")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let pepper = &state.config.password_pepper;

    let user = match state.repo.find_user_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            password::equalize_verification_cost(&payload.password, pepper);
            return Err(ApiError::Authentication);
        }
    };

    if !password::verify_password(&payload.password, pepper, &user.password_hash) {
        return Err(ApiError::Authentication);
    }

    // Inactive accounts fail exactly like bad credentials, after the full
    // verification so the response timing does not reveal the account state.
    if !user.active {
        return Err(ApiError::Authentication);
    }

    // Audit shift: current login timestamp/IP become "last", the new values take
    // their place, and the login counter increments by exactly one.
    let user = state
        .repo
        .record_login(user.id, Utc::now(), client_ip(&headers))
        .await?;

    let token = issue_session_token(&user, &state.config.jwt_secret)?;
    let roles = state.repo.roles_for_user(user.id).await?;
    tracing::info!(user_id = user.id, "login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from_user(&user, roles),
    }))
}

/// logout
///
/// [Authenticated Route] Ends the session by rotating the user's stable session
/// token. Every JWT issued against the old token stops resolving immediately.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Session ended"))
)]
pub async fn logout(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .repo
        .rotate_auth_token(id, &password::generate_session_token())
        .await?;
    tracing::info!(user_id = id, "logout, session token rotated");
    Ok(StatusCode::NO_CONTENT)
}

// --- Password Recovery ---

/// forgot_password
///
/// [Public Route] Initiates password recovery. Always answers 202 regardless of
/// whether the email maps to an account, so the endpoint cannot be used to
/// enumerate registered addresses. For a known active account, a one-time token
/// is generated, its hash stored with a 30-minute expiry, and the token mailed.
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 202, description = "Recovery initiated if the account exists"))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if let Some(user) = state.repo.find_user_by_email(&payload.email).await? {
        if user.active {
            let token = password::generate_reset_token();
            let token_hash = password::hash_password(&token, &state.config.password_pepper)?;
            let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

            state
                .repo
                .set_reset_token(user.id, &token_hash, expires_at)
                .await?;

            // Delivery failure is logged, never surfaced: the response must not
            // change shape based on what happened after the lookup.
            if let Err(e) = state
                .mailer
                .send_password_reset(&user.email, &user.first_name, &token)
                .await
            {
                tracing::warn!(user_id = user.id, "password reset email dispatch failed: {e}");
            }
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// reset_password
///
/// [Public Route] Completes password recovery: verifies the mailed token against
/// its stored hash and expiry, installs the new password hash, and rotates the
/// session token so outstanding sessions die with the old password.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 401, description = "Unknown account, bad token, or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::validation("password", "is required"));
    }

    let pepper = &state.config.password_pepper;
    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(ApiError::Authentication)?;

    let (token_hash, expires_at) = match (&user.reset_token_hash, user.reset_token_expires_at) {
        (Some(hash), Some(expiry)) => (hash.clone(), expiry),
        // No outstanding recovery request.
        _ => return Err(ApiError::Authentication),
    };

    if expires_at < Utc::now() || !password::verify_password(&payload.token, pepper, &token_hash) {
        return Err(ApiError::Authentication);
    }

    let password_hash = password::hash_password(&payload.password, pepper)?;
    state
        .repo
        .reset_password(user.id, &password_hash, &password::generate_session_token())
        .await?;
    tracing::info!(user_id = user.id, "password reset completed");

    Ok(StatusCode::NO_CONTENT)
}

// --- Presentation ---

/// home
///
/// [Authenticated Route] The greeting page, rendering the authenticated user's
/// first name. Read-only; requires authentication but no role.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Greeting", body = Greeting))
)]
pub async fn home(AuthUser { first_name, .. }: AuthUser) -> Json<Greeting> {
    Json(Greeting {
        message: format!("Hello {first_name}!"),
        name: first_name,
    })
}

/// protected
///
/// [Authenticated Route] The role-gated page: the same greeting, but only for
/// holders of the "admin" role. The role check re-runs on every request against
/// the role set resolved by the extractor.
#[utoipa::path(
    get,
    path = "/protected",
    responses(
        (status = 200, description = "Greeting", body = Greeting),
        (status = 403, description = "Missing admin role")
    )
)]
pub async fn protected(user: AuthUser) -> Result<Json<Greeting>, ApiError> {
    user.require_role("admin")?;
    Ok(Json(Greeting {
        message: format!("Hello {}!", user.first_name),
        name: user.first_name,
    }))
}

/// get_me
///
/// [Authenticated Route] The session's profile: identity and current roles as
/// resolved for this request.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(user: AuthUser) -> Json<UserProfile> {
    Json(UserProfile {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        roles: user.roles,
    })
}

// --- Administrative Role Management ---

/// create_role
///
/// [Admin Route] Creates a named role.
///
/// *RBAC*: strict enforcement of the "admin" role before touching the store; the
/// unique role name maps a duplicate to a field-level validation error.
#[utoipa::path(
    post,
    path = "/admin/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 403, description = "Missing admin role")
    )
)]
pub async fn create_role(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    user.require_role("admin")?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name", "is required"));
    }

    let role = state
        .repo
        .create_role(payload.name.trim(), payload.description.trim())
        .await?;
    tracing::info!(role = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

/// delete_role
///
/// [Admin Route] Removes a role by name. Memberships referencing it are
/// cascade-cleared by the store.
#[utoipa::path(
    delete,
    path = "/admin/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such role")
    )
)]
pub async fn delete_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require_role("admin")?;
    if state.repo.delete_role(&name).await? {
        tracing::info!(role = %name, "role deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// assign_role
///
/// [Admin Route] Grants a role to a user. Takes effect on the target's next
/// request, since the gate re-resolves roles every time.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/roles/{name}",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Assigned"),
        (status = 404, description = "No such user or role")
    )
)]
pub async fn assign_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path((user_id, role_name)): Path<(i32, String)>,
) -> Result<StatusCode, ApiError> {
    user.require_role("admin")?;
    if state.repo.find_user_by_id(user_id).await?.is_none() {
        return Ok(StatusCode::NOT_FOUND);
    }
    if state.repo.assign_role(user_id, &role_name).await? {
        tracing::info!(user_id, role = %role_name, "role assigned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// revoke_role
///
/// [Admin Route] Revokes a role from a user. The target's next request fails the
/// authorization check for routes requiring it.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}/roles/{name}",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Revoked"),
        (status = 404, description = "Membership not found")
    )
)]
pub async fn revoke_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path((user_id, role_name)): Path<(i32, String)>,
) -> Result<StatusCode, ApiError> {
    user.require_role("admin")?;
    if state.repo.revoke_role(user_id, &role_name).await? {
        tracing::info!(user_id, role = %role_name, "role revoked");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
