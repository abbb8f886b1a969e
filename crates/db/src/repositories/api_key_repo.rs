//! Repository for the `api_keys` table.

use kbase_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::api_key::{ApiKey, ApiKeyOwner, NewApiKey};

const COLUMNS: &str = "id, user_id, key_id, key_credential, key_signature, created_at, updated_at";

/// Provides storage and lookup for API key credentials.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Store a key for an existing user.
    pub async fn create(pool: &PgPool, user_id: DbId, key: &NewApiKey) -> Result<ApiKey, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, user_id, key).await
    }

    /// Insert a key on an open connection or transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        key: &NewApiKey,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (user_id, key_id, key_credential, key_signature) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(user_id)
            .bind(key.key_id)
            .bind(&key.credential)
            .bind(&key.signature)
            .fetch_one(conn)
            .await
    }

    /// Resolve a credential digest to the owning user and stored signature.
    pub async fn find_owner_by_credential(
        pool: &PgPool,
        credential: &[u8],
    ) -> Result<Option<ApiKeyOwner>, sqlx::Error> {
        sqlx::query_as::<_, ApiKeyOwner>(
            "SELECT u.id AS user_id, u.role, ak.key_id, ak.key_signature \
             FROM api_keys ak \
             JOIN users u ON u.id = ak.user_id \
             WHERE ak.key_credential = $1",
        )
        .bind(credential)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
