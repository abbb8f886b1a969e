use kbase_db::migrate::{self, MigrationError};
use kbase_db::MIGRATOR;
use sqlx::PgPool;

fn versions() -> Vec<i64> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .collect()
}

async fn table_exists(pool: &PgPool, table: &str) -> bool {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

#[sqlx::test(migrations = false)]
async fn up_applies_everything_then_is_a_no_op(pool: PgPool) {
    let applied = migrate::up(&pool, &MIGRATOR, None).await.unwrap();
    assert_eq!(applied, versions());
    assert!(table_exists(&pool, "ingestion_jobs").await);

    let again = migrate::up(&pool, &MIGRATOR, None).await.unwrap();
    assert!(again.is_empty());

    let report = migrate::status(&pool, &MIGRATOR).await.unwrap();
    assert!(report.migrations.iter().all(|m| m.applied));
    assert_eq!(report.current_version, versions().last().copied());
    assert!(report.unknown_applied.is_empty());
}

#[sqlx::test(migrations = false)]
async fn up_to_target_stops_there(pool: PgPool) {
    let first = versions()[0];
    let applied = migrate::up(&pool, &MIGRATOR, Some(first)).await.unwrap();
    assert_eq!(applied, vec![first]);
    assert!(table_exists(&pool, "users").await);
    assert!(!table_exists(&pool, "knowledge_bases").await);
}

#[sqlx::test(migrations = false)]
async fn up_to_unknown_target_fails(pool: PgPool) {
    let err = migrate::up(&pool, &MIGRATOR, Some(42)).await.unwrap_err();
    assert!(matches!(err, MigrationError::UnknownTarget(42)));
}

#[sqlx::test(migrations = false)]
async fn down_reverts_one_step(pool: PgPool) {
    migrate::up(&pool, &MIGRATOR, None).await.unwrap();
    let all = versions();

    let reverted = migrate::down(&pool, &MIGRATOR, None).await.unwrap();
    assert_eq!(reverted, vec![*all.last().unwrap()]);
    assert!(!table_exists(&pool, "knowledge_bases").await);
    assert!(table_exists(&pool, "users").await);
}

#[sqlx::test(migrations = false)]
async fn down_to_zero_reverts_everything(pool: PgPool) {
    migrate::up(&pool, &MIGRATOR, None).await.unwrap();

    let reverted = migrate::down(&pool, &MIGRATOR, Some(0)).await.unwrap();
    assert_eq!(reverted.len(), versions().len());
    assert!(!table_exists(&pool, "users").await);

    let report = migrate::status(&pool, &MIGRATOR).await.unwrap();
    assert_eq!(report.current_version, None);
}

#[sqlx::test(migrations = false)]
async fn down_with_nothing_applied_is_a_no_op(pool: PgPool) {
    let reverted = migrate::down(&pool, &MIGRATOR, None).await.unwrap();
    assert!(reverted.is_empty());
}
