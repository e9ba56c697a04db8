/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. This structure ensures that
/// access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The three modules map directly to the gate's three states.

/// Routes accessible to all clients (registration, login, recovery).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated session.
pub mod authenticated;

/// Routes restricted exclusively to users holding the 'admin' role.
/// Implements mandatory authorization checks.
pub mod admin;
