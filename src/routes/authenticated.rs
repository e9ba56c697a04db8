use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer: the two greeting views, the session profile, and logout.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. This guarantees that all
/// handlers receive a validated `AuthUser` struct containing the user's identity
/// and freshly-resolved roles. The `/protected` view performs its own
/// role-subset check on top of that, so the admin requirement is re-evaluated
/// on every request.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /
        // The home view: greets the authenticated user by first name.
        .route("/", get(handlers::home))
        // GET /protected
        // The role-gated view: the same greeting, restricted to the "admin" role.
        // Missing the role yields 403 rather than the 401 an anonymous request gets.
        .route("/protected", get(handlers::protected))
        // GET /me
        // Retrieves the currently authenticated user's profile and role set.
        .route("/me", get(handlers::get_me))
        // POST /logout
        // Ends the session by rotating the stable session token, which
        // immediately invalidates every outstanding JWT bound to it.
        .route("/logout", post(handlers::logout))
}
