use sqlx::PgPool;

/// Every table has `created_at`/`updated_at` as timestamptz.
#[sqlx::test(migrations = "./migrations")]
async fn all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::TEXT
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!tables.is_empty());
    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let result: Option<(String,)> = sqlx::query_as(
                "SELECT data_type::TEXT
                 FROM information_schema.columns
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(table)
            .bind(col)
            .fetch_optional(&pool)
            .await
            .unwrap();

            let (data_type,) =
                result.unwrap_or_else(|| panic!("Table {table} is missing column {col}"));
            assert_eq!(
                data_type, "timestamp with time zone",
                "Table {table}.{col} should be timestamptz, got {data_type}"
            );
        }
    }
}

/// `updated_at` moves forward on update.
#[sqlx::test(migrations = "./migrations")]
async fn updated_at_trigger_fires(pool: PgPool) {
    let (id, before): (i64, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        "INSERT INTO users (email, role) VALUES ('t@example.com', 'USER') RETURNING id, updated_at",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    sqlx::query("UPDATE users SET updated_at = '2000-01-01', role = 'ADMIN' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let (after,): (chrono::DateTime<chrono::Utc>,) =
        sqlx::query_as("SELECT updated_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(after >= before);
}

/// Only one signing key may be active.
#[sqlx::test(migrations = "./migrations")]
async fn single_active_signing_key(pool: PgPool) {
    sqlx::query("INSERT INTO encryption_keys (symmetric_key, is_active) VALUES ('\\x01', true)")
        .execute(&pool)
        .await
        .unwrap();
    let second =
        sqlx::query("INSERT INTO encryption_keys (symmetric_key, is_active) VALUES ('\\x02', true)")
            .execute(&pool)
            .await;
    assert!(second.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn health_check_succeeds(pool: PgPool) {
    kbase_db::health_check(&pool).await.unwrap();
}
