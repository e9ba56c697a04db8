use crate::errors::ApiError;
use crate::models::{NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations against the
/// user/role store. This is the core of the Repository Abstraction pattern,
/// allowing the handlers to interact with the data layer without knowing the
/// specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable and usable across Axum's
/// asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User Lookup ---
    // Email matching is case-insensitive: emails are stored lowercased and the
    // implementation lowercases the argument before comparing.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, ApiError>;
    // Session resolution: the stable per-account token embedded in the JWT.
    async fn find_user_by_auth_token(&self, token: &str) -> Result<Option<User>, ApiError>;

    // --- User Lifecycle ---
    // Inserts a validated, already-hashed registration. A unique violation on the
    // email column (including a concurrent duplicate-registration race) is mapped
    // to a ValidationError rather than a generic persistence failure.
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError>;
    // Audit shift on successful authentication: current login timestamp/IP become
    // "last", the new values take their place, and the counter increments by one.
    async fn record_login(
        &self,
        user_id: i32,
        at: DateTime<Utc>,
        ip: Option<String>,
    ) -> Result<User, ApiError>;
    // Replaces the stable session token, invalidating every outstanding session.
    async fn rotate_auth_token(&self, user_id: i32, token: &str) -> Result<(), ApiError>;

    // --- Password Recovery ---
    async fn set_reset_token(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ApiError>;
    // Installs the new hash, rotates the session token, and clears recovery state
    // in a single statement.
    async fn reset_password(
        &self,
        user_id: i32,
        password_hash: &str,
        auth_token: &str,
    ) -> Result<(), ApiError>;

    // --- Roles & Membership ---
    async fn roles_for_user(&self, user_id: i32) -> Result<Vec<String>, ApiError>;
    async fn create_role(&self, name: &str, description: &str) -> Result<Role, ApiError>;
    // Deleting a role cascade-clears memberships referencing it. Returns false if
    // no role by that name existed.
    async fn delete_role(&self, name: &str) -> Result<bool, ApiError>;
    // Both return false when the named role does not exist (assign is idempotent:
    // re-assigning an already-held role also reports true).
    async fn assign_role(&self, user_id: i32, role_name: &str) -> Result<bool, ApiError>;
    async fn revoke_role(&self, user_id: i32, role_name: &str) -> Result<bool, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// Column list shared by every query that materializes a full `User` row.
const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, active, auth_token, \
     last_login_at, current_login_at, last_login_ip, current_login_ip, login_count, \
     confirmed_at, reset_token_hash, reset_token_expires_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL
/// database. The pool is request-scoped at the connection level: each query checks
/// a connection out and returns it when the future completes, so no connection is
/// ever shared across requests.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// find_user_by_email
    ///
    /// Case-insensitive lookup: the stored email is already lowercased, so it is
    /// enough to lowercase the argument.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_auth_token(&self, token: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE auth_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts a new account with an empty role set. New accounts start active.
    /// The database-level UNIQUE constraint on email is the last line of defense
    /// against the duplicate-registration race; a violation surfaces as a
    /// field-level validation error, never a silent overwrite.
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO app_user (email, first_name, last_name, password_hash, active, auth_token) \
             VALUES ($1, $2, $3, $4, TRUE, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .bind(user.auth_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_write(e, "email"))
    }

    /// record_login
    ///
    /// The audit shift. Performed in a single UPDATE so the last/current swap and
    /// the counter increment are atomic with respect to concurrent logins.
    async fn record_login(
        &self,
        user_id: i32,
        at: DateTime<Utc>,
        ip: Option<String>,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE app_user SET \
                 last_login_at = current_login_at, \
                 last_login_ip = current_login_ip, \
                 current_login_at = $2, \
                 current_login_ip = $3, \
                 login_count = login_count + 1 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(at)
        .bind(ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn rotate_auth_token(&self, user_id: i32, token: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE app_user SET auth_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE app_user SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// reset_password
    ///
    /// Installing the new hash, rotating the session token, and clearing the
    /// recovery state happen in one statement: a completed reset leaves no
    /// outstanding token and no live session.
    async fn reset_password(
        &self,
        user_id: i32,
        password_hash: &str,
        auth_token: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE app_user SET \
                 password_hash = $2, \
                 auth_token = $3, \
                 reset_token_hash = NULL, \
                 reset_token_expires_at = NULL \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(auth_token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// roles_for_user
    ///
    /// Resolves the user's current role set through the membership join table.
    /// Called on every authenticated request; authorization decisions are never
    /// cached across requests.
    async fn roles_for_user(&self, user_id: i32) -> Result<Vec<String>, ApiError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM app_role r \
             JOIN app_roles_users ru ON ru.role_id = r.id \
             WHERE ru.user_id = $1 \
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    /// create_role
    ///
    /// Administrative role creation. The unique name constraint maps to a
    /// field-level validation error on conflict.
    async fn create_role(&self, name: &str, description: &str) -> Result<Role, ApiError> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO app_role (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_write(e, "name"))
    }

    /// delete_role
    ///
    /// Membership rows referencing the role disappear with it via ON DELETE CASCADE.
    async fn delete_role(&self, name: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM app_role WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// assign_role
    ///
    /// Inserts a membership row. `ON CONFLICT DO NOTHING` makes re-assignment
    /// idempotent; a missing role yields zero candidate rows and reports false.
    async fn assign_role(&self, user_id: i32, role_name: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO app_roles_users (user_id, role_id) \
             SELECT $1, id FROM app_role WHERE name = $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        // Zero rows means either the role does not exist (false) or the
        // membership was already present (true, idempotent success).
        let held = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM app_roles_users ru \
             JOIN app_role r ON r.id = ru.role_id \
             WHERE ru.user_id = $1 AND r.name = $2",
        )
        .bind(user_id)
        .bind(role_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(held > 0)
    }

    async fn revoke_role(&self, user_id: i32, role_name: &str) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "DELETE FROM app_roles_users ru \
             USING app_role r \
             WHERE ru.role_id = r.id AND ru.user_id = $1 AND r.name = $2",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
