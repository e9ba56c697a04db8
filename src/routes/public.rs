use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// These are the gateway functions of the identity flow: registration, login,
/// and password recovery.
///
/// Security Mandate:
/// None of these handlers may reveal whether an email is registered beyond what
/// registration itself requires: login failures are generic, and recovery always
/// answers 202.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates a new account from email/password/first/last name, hashes the
        // password, and dispatches the (non-fatal) confirmation email.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Verifies credentials, shifts the login audit fields, and issues the
        // session JWT bound to the account's stable session token.
        .route("/login", post(handlers::login))
        // POST /forgot-password
        // Starts password recovery. Responds 202 whether or not the email exists.
        .route("/forgot-password", post(handlers::forgot_password))
        // POST /reset-password
        // Redeems a mailed recovery token for a new password and rotates the
        // session token.
        .route("/reset-password", post(handlers::reset_password))
}
