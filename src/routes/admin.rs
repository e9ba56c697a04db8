use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role:
/// the administrative side of the role lifecycle (create/delete roles,
/// assign/revoke memberships).
///
/// Access Control:
/// Every handler here takes the `AuthUser` extractor (401 for anonymous
/// requests) and performs the explicit `require_role("admin")` check before
/// touching the store. Because the gate re-resolves roles on each request, a
/// revocation takes effect on the target's very next request.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/roles
        // Creates a named role. Duplicate names surface as field-level errors.
        .route("/roles", post(handlers::create_role))
        // DELETE /admin/roles/{name}
        // Removes a role; memberships referencing it are cascade-cleared.
        .route("/roles/{name}", delete(handlers::delete_role))
        // POST /admin/users/{id}/roles/{name}
        // Grants a role to a user (idempotent).
        .route("/users/{id}/roles/{name}", post(handlers::assign_role))
        // DELETE /admin/users/{id}/roles/{name}
        // Revokes a role from a user.
        .route("/users/{id}/roles/{name}", delete(handlers::revoke_role))
}
