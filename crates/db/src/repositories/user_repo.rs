//! Repository for the `users` table.

use kbase_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::api_key::NewApiKey;
use crate::models::status::{ClientRole, ProvisionerStatus};
use crate::models::user::{User, UserListItem};

const COLUMNS: &str = "id, email, role, created_at, updated_at";

/// Outcome of [`UserRepo::delete_cascade`].
#[derive(Debug, Clone, Default)]
pub struct DeletedUser {
    /// Object keys of the user's documents, to be removed from the bucket.
    pub object_keys: Vec<String>,
    /// Number of vector indexes moved to `CLEANUP`.
    pub released_indexes: u64,
}

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Create a user together with their first API key in one transaction.
    ///
    /// A duplicate email surfaces as a unique violation on `uq_users_email`.
    pub async fn create_with_key(
        pool: &PgPool,
        email: &str,
        role: ClientRole,
        key: &NewApiKey,
    ) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO users (email, role) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(role)
            .fetch_one(&mut *tx)
            .await?;

        super::ApiKeyRepo::insert(&mut tx, user.id, key).await?;

        tx.commit().await?;
        Ok(user)
    }

    /// List users ordered by id, with the total count.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UserListItem>, i64), sqlx::Error> {
        let users = sqlx::query_as::<_, UserListItem>(
            "SELECT id, email, role FROM users ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok((users, total.0))
    }

    /// Set a user's role. Returns `None` if the user does not exist.
    pub async fn set_role(
        pool: &PgPool,
        id: DbId,
        role: ClientRole,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Delete a user and everything they own.
    ///
    /// The user's vector indexes move to `CLEANUP` before their knowledge
    /// bases cascade away, so the cleanup worker can reclaim them. Returns
    /// `None` if the user does not exist.
    pub async fn delete_cascade(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DeletedUser>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let exists: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let released = release_user_indexes(&mut tx, id).await?;

        let object_keys: Vec<(String,)> =
            sqlx::query_as("SELECT object_key FROM documents_registry WHERE user_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(DeletedUser {
            object_keys: object_keys.into_iter().map(|(k,)| k).collect(),
            released_indexes: released,
        }))
    }
}

async fn release_user_indexes(conn: &mut PgConnection, user_id: DbId) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE vector_indexes SET status = $2 \
         WHERE id IN (SELECT index_id FROM knowledge_bases WHERE user_id = $1)",
    )
    .bind(user_id)
    .bind(ProvisionerStatus::Cleanup)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
