use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The application-wide error taxonomy. Every fallible service operation funnels
/// into one of these variants, and the `IntoResponse` implementation below is the
/// single place where errors are rendered to HTTP.
///
/// Propagation rules:
/// - `Validation` and `Authentication` are user-facing form errors.
/// - `Authorization` becomes an HTTP denial (403).
/// - `Persistence` surfaces as a generic failure; unique-constraint violations on
///   write are mapped back to `Validation` before they ever reach this point.
/// - `Delivery` is non-fatal: callers log it and carry on, it never fails the
///   operation that triggered the send.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or duplicate registration input, reported per field.
    #[error("validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    /// Bad credentials. Deliberately carries no detail: unknown email, wrong
    /// password, and inactive account are indistinguishable to the caller.
    #[error("authentication failed")]
    Authentication,

    /// Authenticated but missing a required role.
    #[error("missing required role")]
    Authorization,

    /// The persistence store is unavailable or a query failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Mail send failed. Logged and surfaced as a warning, never an HTTP error.
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

impl ApiError {
    /// validation
    ///
    /// Convenience constructor for field-level validation failures.
    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// from_write
    ///
    /// Maps a persistence error raised by an INSERT/UPDATE back into the taxonomy.
    /// A unique-constraint violation at commit time (e.g. a concurrent duplicate
    /// registration race) becomes a `Validation` error on the given field rather
    /// than a generic failure, so the caller sees the same shape as an up-front
    /// duplicate check.
    pub fn from_write(err: sqlx::Error, field: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return ApiError::validation(field, "already exists");
            }
        }
        ApiError::Persistence(err)
    }
}

impl IntoResponse for ApiError {
    /// into_response
    ///
    /// Renders the error taxonomy to HTTP. No error leaves this function without at
    /// least one log record, and internal details (SQL errors, mail errors) are
    /// never included in the response body.
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation { field, message } => {
                tracing::debug!(field = %field, "request rejected by validation: {message}");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "validation", "field": field, "message": message }),
                )
            }
            ApiError::Authentication => {
                tracing::debug!("authentication failure");
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "error": "authentication", "message": "invalid credentials or session" }),
                )
            }
            ApiError::Authorization => {
                tracing::debug!("authorization failure");
                (
                    StatusCode::FORBIDDEN,
                    json!({ "error": "authorization", "message": "missing required role" }),
                )
            }
            ApiError::Persistence(e) => {
                tracing::error!("persistence failure: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "message": "internal server error" }),
                )
            }
            ApiError::Delivery(e) => {
                // Reaching here means a caller forgot to absorb a delivery error;
                // log it loudly but still answer with a generic failure.
                tracing::error!("unhandled mail delivery failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "message": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
