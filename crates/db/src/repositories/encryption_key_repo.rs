//! Repository for the `encryption_keys` table.

use sqlx::PgPool;

use crate::models::encryption_key::EncryptionKey;

const COLUMNS: &str = "id, symmetric_key, is_active, expired_at, created_at, updated_at";

/// Provides access to signing keys.
pub struct EncryptionKeyRepo;

impl EncryptionKeyRepo {
    /// Fetch the active signing key, if one exists.
    pub async fn find_active(pool: &PgPool) -> Result<Option<EncryptionKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM encryption_keys WHERE is_active LIMIT 1");
        sqlx::query_as::<_, EncryptionKey>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Store a new key and make it the active one, retiring any previous
    /// active key.
    pub async fn create_active(pool: &PgPool, key: &[u8]) -> Result<EncryptionKey, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE encryption_keys SET is_active = false WHERE is_active")
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO encryption_keys (symmetric_key, is_active) \
             VALUES ($1, true) \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, EncryptionKey>(&query)
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }
}
