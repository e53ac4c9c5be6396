use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{Role, User},
};

/// Lookups the session layer needs from user management.
///
/// Inactive users are treated exactly like deleted ones.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds an active user by username, for credential checks at login.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Whether an active user with this ID exists.
    async fn user_exists(&self, user_id: Uuid) -> Result<bool>;

    /// The current role of an active user.
    async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let role: String = row
        .try_get("role")
        .map_err(|_| AppError::MissingData("role".to_string()))?;

    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        password_hash: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: role.parse().map_err(AppError::MissingData)?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
    })
}

/// Users stored in PostgreSQL.
///
/// Expects `users(id uuid, username text, password text, role text, is_active bool)`.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: Pool,
}

impl PgUserDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, username, password, role, is_active
                FROM users
                WHERE username = $1 AND is_active = true
                "#,
                &[&username],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT 1
                FROM users
                WHERE id = $1 AND is_active = true
                "#,
                &[&user_id],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT role
                FROM users
                WHERE id = $1 AND is_active = true
                "#,
                &[&user_id],
            )
            .await?;

        row.map(|r| {
            let role: String = r
                .try_get("role")
                .map_err(|_| AppError::MissingData("role".to_string()))?;
            role.parse().map_err(AppError::MissingData)
        })
        .transpose()
    }
}
